//! Per-call execution context supplied by the host.

use serde::{Deserialize, Serialize};
use timevault_protocol::{Address, Timestamp};

use crate::error::{VaultError, VaultResult};

/// What the host knows about a single call: who is calling, how much value
/// they attached, and what time it is.
///
/// The engine trusts all three. Authenticating `caller` and actually moving
/// `value` into custody is the host's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub value: u64,
    pub now: Timestamp,
}

impl CallContext {
    /// A call with no attached value.
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self {
            caller,
            value: 0,
            now,
        }
    }

    /// The same call carrying `value`.
    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    /// Rejects the call if it carries value.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnexpectedValue`] when `value > 0`.
    pub fn ensure_no_value(&self) -> VaultResult<()> {
        if self.value > 0 {
            return Err(VaultError::UnexpectedValue {
                attached: self.value,
            });
        }
        Ok(())
    }
}
