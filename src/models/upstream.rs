//! Shapes of the documents served by a FiveM server's HTTP query endpoints.
//!
//! Only the fields we read are modelled; unknown or mistyped fields are ignored.

use serde_json::Value;

/// One element of `players.json`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerEntry {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub ping: Option<i64>,
    pub identifiers: Vec<String>,
}

impl PlayerEntry {
    /// Read each field on its own; a mistyped field is dropped without
    /// affecting the others.
    pub fn from_document(item: &Value) -> Self {
        Self {
            id: item.get("id").and_then(integer),
            name: item
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            ping: item.get("ping").and_then(integer),
            identifiers: item
                .get("identifiers")
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Whole numbers, also when sent as floats or numeric strings
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The parts of `info.json` we use
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerInfo {
    pub hostname: Option<String>,
    pub max_clients: Option<u32>,
}

impl ServerInfo {
    /// Read `vars.sv_hostname` and `vars.sv_maxClients`.
    ///
    /// Returns `None` when the document is not a JSON object.
    pub fn from_document(document: &Value) -> Option<Self> {
        let object = document.as_object()?;
        let vars = object.get("vars").and_then(Value::as_object);

        let hostname = vars
            .and_then(|v| v.get("sv_hostname"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let max_clients = vars
            .and_then(|v| v.get("sv_maxClients"))
            .and_then(|value| match value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse::<u64>().ok(),
                _ => None,
            })
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok());

        Some(Self {
            hostname,
            max_clients,
        })
    }
}

/// Decode `players.json`; anything that is not an array counts as nobody online.
///
/// Entries that are not objects still count toward the total.
pub fn players_from_document(document: Value) -> Vec<PlayerEntry> {
    match document {
        Value::Array(items) => items.iter().map(PlayerEntry::from_document).collect(),
        _ => Vec::new(),
    }
}

/// Length of `dynamic.json`'s `resources` array, when there is one
pub fn resource_count_from_document(document: &Value) -> Option<u32> {
    document
        .get("resources")
        .and_then(Value::as_array)
        .and_then(|resources| u32::try_from(resources.len()).ok())
}
