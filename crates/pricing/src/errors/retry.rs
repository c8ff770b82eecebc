/// Classification for how the orchestrator reacts to a source error.
///
/// # Behavior Summary
///
/// | Class | Retry this tier? | Continue the ladder? |
/// |-------|------------------|----------------------|
/// | `Never` | No | No, the row (or batch) fails |
/// | `RetryOnce` | Yes, once after backoff | Yes, as a zero-result tier |
/// | `TreatAsEmpty` | No | Yes, as a zero-result tier |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Terminal. Invalid input or an unreachable cache; retrying won't help.
    Never,

    /// Transport or auth failure reaching a listing source.
    ///
    /// The tier is retried once. If it still fails the tier contributes no
    /// listings and the ladder advances.
    RetryOnce,

    /// The source answered but the answer is unusable (undecodable payload,
    /// scraping pattern mismatch, unsupported operation).
    /// Logged and treated as zero listings.
    TreatAsEmpty,
}
