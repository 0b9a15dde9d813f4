use serde::{Deserialize, Serialize};

/// Author rows are provisioned by the identity service; this crate only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub handle: String,
}
