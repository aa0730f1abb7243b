//! CREWKIT Collab — the collaboration core.
//!
//! Four components own all cross-entity invariants of the system:
//!
//! - [`membership`] — company/project member ledger with owner
//!   protection;
//! - [`invitations`] — the pending → accepted/declined invitation
//!   workflow;
//! - [`tasks`] — the task lifecycle engine with derived completion
//!   timestamps and append-only history;
//! - [`bus`] — topic-keyed event fan-out to connected clients.
//!
//! Services are generic over the `crewkit-core` repository traits and
//! publish to the bus only after the authoritative write has
//! committed; notification dispatch is fire-and-forget behind
//! [`notify::Notifier`].

pub mod bus;
pub mod invitations;
pub mod membership;
pub mod notify;
pub mod onboarding;
pub mod tasks;

pub use bus::{BusEvent, EventBus};
pub use invitations::{InvitationService, InviteOutcome};
pub use membership::{MembershipService, PlanLimits};
pub use notify::{LogNotifier, Notifier};
pub use onboarding::{SignupInput, SignupOutcome, SignupPolicy, SignupService};
pub use tasks::TaskService;
