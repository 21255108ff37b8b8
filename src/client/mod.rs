//! Client side of the portal: the API contract, its HTTP implementation,
//! the workflow store a UI binds to and the view derivations it renders.

pub mod api;
pub mod http;
pub mod store;
pub mod view;

pub use api::{ClientError, ErrorKind, PortalApi};
pub use http::HttpPortalApi;
pub use store::{
    Action, Control, ListState, Notice, NoticeLevel, Outcome, StoreState, WorkflowStore,
};
pub use view::{AppointmentBoard, PendingConnectionsView};
