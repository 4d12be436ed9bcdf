use anyhow::Result;
use log::warn;
use prometheus::{histogram_opts, opts, HistogramVec, IntCounter, IntCounterVec, IntGauge};
use types::primitives::{Epoch, Slot};

/// Metrics exported by the fork choice mutator.
///
/// Gauges are updated after every message, so they always describe the latest published store.
#[derive(Debug)]
pub struct Metrics {
    // Mutator
    pub fc_message_times: HistogramVec,
    mutator_messages: IntCounterVec,
    fc_queue_length: IntGauge,

    // Store
    fc_head_slot: IntGauge,
    fc_justified_epoch: IntGauge,
    fc_finalized_epoch: IntGauge,
    fc_confirmed_slot: IntGauge,
    fc_reorgs: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // Mutator
            fc_message_times: HistogramVec::new(
                histogram_opts!(
                    "FC_MESSAGE_TIMES",
                    "Time spent by the fork choice mutator on each kind of message",
                ),
                &["kind"],
            )?,

            mutator_messages: IntCounterVec::new(
                opts!(
                    "MUTATOR_MESSAGES",
                    "Counter for messages handled by the fork choice mutator by outcome",
                ),
                &["kind", "outcome"],
            )?,

            fc_queue_length: IntGauge::new(
                "FC_QUEUE_LENGTH",
                "Number of messages delayed in the fork choice queue",
            )?,

            // Store
            fc_head_slot: IntGauge::new("FC_HEAD_SLOT", "Slot of the fork choice head")?,

            fc_justified_epoch: IntGauge::new(
                "FC_JUSTIFIED_EPOCH",
                "Epoch of the justified checkpoint in the fork choice store",
            )?,

            fc_finalized_epoch: IntGauge::new(
                "FC_FINALIZED_EPOCH",
                "Epoch of the finalized checkpoint in the fork choice store",
            )?,

            fc_confirmed_slot: IntGauge::new(
                "FC_CONFIRMED_SLOT",
                "Slot of the latest block confirmed by the confirmation rule",
            )?,

            fc_reorgs: IntCounter::new(
                "FC_REORGS_TOTAL",
                "Number of head changes to a block that does not descend from the old head",
            )?,
        })
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        let default_registry = prometheus::default_registry();

        default_registry.register(Box::new(self.fc_message_times.clone()))?;
        default_registry.register(Box::new(self.mutator_messages.clone()))?;
        default_registry.register(Box::new(self.fc_queue_length.clone()))?;
        default_registry.register(Box::new(self.fc_head_slot.clone()))?;
        default_registry.register(Box::new(self.fc_justified_epoch.clone()))?;
        default_registry.register(Box::new(self.fc_finalized_epoch.clone()))?;
        default_registry.register(Box::new(self.fc_confirmed_slot.clone()))?;
        default_registry.register(Box::new(self.fc_reorgs.clone()))?;

        Ok(())
    }

    // Mutator
    pub fn register_mutator_message(&self, kind: &str, outcome: &str) {
        match self
            .mutator_messages
            .get_metric_with_label_values(&[kind, outcome])
        {
            Ok(counter) => counter.inc(),
            Err(error) => {
                warn!("unable to register mutator message ({kind}, {outcome}): {error:?}")
            }
        }
    }

    pub fn set_queue_length(&self, length: usize) {
        self.fc_queue_length
            .set(i64::try_from(length).unwrap_or(i64::MAX));
    }

    // Store
    pub fn set_head_slot(&self, slot: Slot) {
        self.fc_head_slot.set(saturating_i64(slot));
    }

    pub fn set_justified_epoch(&self, epoch: Epoch) {
        self.fc_justified_epoch.set(saturating_i64(epoch));
    }

    pub fn set_finalized_epoch(&self, epoch: Epoch) {
        self.fc_finalized_epoch.set(saturating_i64(epoch));
    }

    pub fn set_confirmed_slot(&self, slot: Slot) {
        self.fc_confirmed_slot.set(saturating_i64(slot));
    }

    pub fn register_reorg(&self) {
        self.fc_reorgs.inc();
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
