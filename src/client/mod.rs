//! Display client.
//!
//! Joins the network, polls `/api/all`, draws the result on a 128x64 text
//! display and maps two push buttons to `/api/shutdown` and `/api/update`.
//! Everything runs sequentially on one task.

pub mod api;
pub mod app;
pub mod buttons;
pub mod display;
pub mod link;

pub use api::MetricsClient;
pub use app::{Action, ClientApp};
pub use display::{DisplaySurface, FrameBuffer, LogDisplay, Screen, TerminalDisplay};
pub use link::{LinkState, LinkSupervisor, NetworkLink, NmcliLink};
