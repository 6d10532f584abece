use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known id of the category tagging the outgoing leg of a transfer.
pub const TRANSFER_OUT_CATEGORY: Uuid = Uuid::from_u128(0x7f1c_0d2a_0000_4000_8000_0000_0000_0001);
/// Well-known id of the category tagging the incoming leg of a transfer.
pub const TRANSFER_IN_CATEGORY: Uuid = Uuid::from_u128(0x7f1c_0d2a_0000_4000_8000_0000_0000_0002);

/// Categories reserved for transfer legs. They are excluded from income and
/// expense reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReservedCategories {
    pub transfer_out: Uuid,
    pub transfer_in: Uuid,
}

impl ReservedCategories {
    pub fn is_reserved(&self, category_id: Option<Uuid>) -> bool {
        category_id.is_some_and(|id| id == self.transfer_out || id == self.transfer_in)
    }
}

impl Default for ReservedCategories {
    fn default() -> Self {
        Self {
            transfer_out: TRANSFER_OUT_CATEGORY,
            transfer_in: TRANSFER_IN_CATEGORY,
        }
    }
}
