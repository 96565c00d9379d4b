//! The assembled program as the simulator consumes it.

use serde::{Deserialize, Serialize};

/// Named, host-visible memory slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRegion {
    pub address: u32,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Encoded instruction words and raw literal words, in address order.
    pub stack: Vec<u32>,
    /// Sorted, unique absolute data addresses referenced by instructions.
    pub regions: Vec<u32>,
    #[serde(rename = "readRegions")]
    pub read_regions: Vec<ReadRegion>,
}

impl Artifact {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_simulator_field_names() {
        let artifact = Artifact {
            stack: vec![0x56, 5],
            regions: vec![3],
            read_regions: vec![ReadRegion {
                address: 3,
                name: "counter".into(),
            }],
        };
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["stack"], serde_json::json!([86, 5]));
        assert_eq!(json["readRegions"][0]["name"], "counter");
        assert!(json.get("read_regions").is_none());
        let back = Artifact::from_json(&artifact.to_json().unwrap()).unwrap();
        assert_eq!(back, artifact);
    }
}
