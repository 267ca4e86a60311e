mod auth;
mod event;
mod frame;
mod liveness;
mod protocol;
#[allow(clippy::module_inception)]
mod server;
mod session;
mod slot;

pub(crate) use {
    auth::{AuthDecision, Authorizer, ConsoleAuthorizer},
    event::{ExecutionResult, ServerEvent},
    frame::LineBuffer,
    protocol::{ClientRequest, Message, ServerMessage, parse_layout},
    server::{Server, enigo_injector_factory},
    session::{Session, SessionId},
    slot::{ExecutionSlot, RunToken},
};

#[cfg(test)]
pub(crate) use {
    auth::parse_answer, protocol::LayoutEntry, server::InjectorFactory, session::OUTBOUND_CAPACITY,
};
