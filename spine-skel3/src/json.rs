//! JSON rendering of a decoded [`Document`], in the layout of the Spine 3.x JSON export.

use crate::{Document, Error};

impl Document {
    pub fn to_json_value(&self) -> Result<serde_json::Value, Error> {
        serde_json::to_value(self).map_err(|e| Error::Json {
            message: e.to_string(),
        })
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Json {
            message: e.to_string(),
        })
    }

    pub fn to_json_string_pretty(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Json {
            message: e.to_string(),
        })
    }
}
