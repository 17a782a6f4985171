use bson::Document as BsonDocument;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shipment record as stored in the aggregate collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "itemID")]
    pub item_id: Uuid,
    #[serde(rename = "dateArrived")]
    pub date_arrived: i64,
    #[serde(rename = "deviceID")]
    pub device_id: Uuid,
    pub lot: String,
    pub name: String,
    pub origin: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(rename = "rsCustomerID")]
    pub rs_customer_id: Uuid,
    #[serde(rename = "salePrice")]
    pub sale_price: f64,
    pub sku: String,
    pub timestamp: i64,
    #[serde(rename = "totalWeight")]
    pub total_weight: f64,
    pub upc: i64,
    #[serde(rename = "wasteWeight")]
    pub waste_weight: f64,
}

impl Shipment {
    /// JSON-compatible BSON form: identifiers become strings, numbers stay numbers.
    ///
    /// # Errors
    /// Returns an error if the record cannot be represented as a BSON document.
    pub fn to_document(&self) -> Result<BsonDocument, crate::errors::StoreError> {
        let mut plain = self.clone();
        let id = plain.id.take();
        let v = serde_json::to_value(&plain)?;
        let mut doc = bson::to_document(&v)?;
        if let Some(oid) = id {
            doc.insert("_id", oid);
        }
        Ok(doc)
    }
}
