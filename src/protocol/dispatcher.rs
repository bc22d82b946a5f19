use crate::core::command::Command;
use crate::core::packet::Packet;
use crate::protocol::session::{MessageHandler, Session};
use std::collections::HashMap;

type RouteFn = dyn FnMut(&mut Session, Packet) + Send + 'static;

/// Routes inbound packets to a handler per command.
///
/// Packets whose command has no route, reserved codes included, go to the
/// fallback. Malformed frames arrive as [`Command::None`].
#[derive(Default)]
pub struct Dispatcher {
    routes: HashMap<u8, Box<RouteFn>>,
    fallback: Option<Box<RouteFn>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, command: Command, handler: F)
    where
        F: FnMut(&mut Session, Packet) + Send + 'static,
    {
        self.routes.insert(command.code(), Box::new(handler));
    }

    /// Builder form of [`Dispatcher::register`].
    pub fn route<F>(mut self, command: Command, handler: F) -> Self
    where
        F: FnMut(&mut Session, Packet) + Send + 'static,
    {
        self.register(command, handler);
        self
    }

    pub fn fallback<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&mut Session, Packet) + Send + 'static,
    {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Hand `packet` to its route. Returns false when nothing handled it.
    pub fn dispatch(&mut self, session: &mut Session, packet: Packet) -> bool {
        if let Some(handler) = self.routes.get_mut(&packet.command) {
            handler(session, packet);
            return true;
        }

        match self.fallback.as_mut() {
            Some(handler) => {
                handler(session, packet);
                true
            }
            None => false,
        }
    }

    /// Turn the dispatcher into a session message handler.
    pub fn into_handler(mut self) -> MessageHandler {
        Box::new(move |session, packet| {
            self.dispatch(session, packet);
        })
    }
}
