/// Node-local settings. Unlike [`Config`], these do not affect consensus.
///
/// [`Config`]: types::config::Config
#[derive(Clone, Copy, Debug)]
pub struct StoreConfig {
    /// Upper bound on the number of deferred messages. The oldest ones are dropped first.
    pub max_queued_messages: usize,
    /// Whether to maintain a confirmed block on every slot.
    pub confirmation_rule: bool,
    /// Whether to drop blocks and votes that can no longer affect fork choice after finalization.
    pub prune_below_finalized: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_queued_messages: 4096,
            confirmation_rule: true,
            prune_below_finalized: true,
        }
    }
}
