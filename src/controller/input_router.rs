use std::collections::HashMap;

use crossbeam_channel::Sender;
use tracing::{debug, info, trace, warn};

use super::input::InputProvider;
use super::input_context::{ContextKind, InputContext};
use super::scheduler::Tick;
use crate::actor::{Actor, Address, Context, Recipient};
use crate::model::EntityHandle;

/// A context forwarded to its owner, carrying the output of the latest sample.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub handle: EntityHandle,
    pub context: InputContext,
    pub active: bool,
}

pub enum RouterMessage {
    /// Appends to whatever `handle` already registered. The latest `owner` receives all of them.
    RegisterContexts {
        handle: EntityHandle,
        owner: Recipient<InputEvent>,
        contexts: Vec<InputContext>,
    },
    UnregisterContexts {
        handle: EntityHandle,
        kinds: Vec<ContextKind>,
    },
    UnregisterAll(EntityHandle),
    InputTick(Tick),
    Count(Sender<usize>),
}

impl From<Tick> for RouterMessage {
    fn from(tick: Tick) -> Self {
        RouterMessage::InputTick(tick)
    }
}

struct Registration {
    context: InputContext,
    was_active: bool,
}

struct Subscriber {
    owner: Recipient<InputEvent>,
    contexts: Vec<Registration>,
}

/// Samples the input provider once per input tick and drives every registered context.
pub struct InputRouter {
    provider: Box<dyn InputProvider>,
    subscribers: HashMap<EntityHandle, Subscriber>,
    outage: bool,
}

impl InputRouter {
    pub fn new(provider: impl InputProvider) -> Self {
        Self { provider: Box::new(provider), subscribers: HashMap::new(), outage: false }
    }

    fn context_count(&self) -> usize {
        self.subscribers.values().map(|s| s.contexts.len()).sum()
    }

    fn on_tick(&mut self, tick: Tick) {
        if let Err(err) = self.provider.update() {
            // contexts keep their previous active flags until the provider is back
            if !self.outage {
                warn!("input provider unavailable, skipping input ticks: {err}");
                self.outage = true;
            }
            return;
        }
        if self.outage {
            info!("input provider recovered");
            self.outage = false;
        }

        let snapshot = self.provider.snapshot();
        let (capture_keyboard, capture_mouse) = (snapshot.want_capture_keyboard, snapshot.want_capture_mouse);

        let mut gone = Vec::new();
        for (&handle, subscriber) in self.subscribers.iter_mut() {
            for registration in subscriber.contexts.iter_mut() {
                let context = &mut registration.context;
                let before = context.clone();
                let is_active = context.process(tick.delta_time, &snapshot, capture_keyboard, capture_mouse);
                let changed = *context != before;
                if context.policy().should_emit(registration.was_active, is_active, changed) {
                    trace!(%handle, kind = ?context.kind(), is_active, "input event");
                    let event = InputEvent { handle, context: context.clone(), active: is_active };
                    if !subscriber.owner.send(event) {
                        gone.push(handle);
                    }
                }
                registration.was_active = is_active;
            }
        }

        for handle in gone {
            if self.subscribers.remove(&handle).is_some() {
                debug!(%handle, "dropping input contexts of a stopped owner");
            }
        }
    }
}

impl Actor for InputRouter {
    type Message = RouterMessage;

    fn name(&self) -> &'static str {
        "input"
    }

    fn handle(&mut self, msg: RouterMessage, _ctx: &Context<RouterMessage>) {
        match msg {
            RouterMessage::RegisterContexts { handle, owner, contexts } => {
                debug!(%handle, count = contexts.len(), owner = owner.name(), "registering input contexts");
                let registrations = contexts
                    .into_iter()
                    .map(|context| Registration { context, was_active: false });
                match self.subscribers.get_mut(&handle) {
                    Some(subscriber) => {
                        subscriber.owner = owner;
                        subscriber.contexts.extend(registrations);
                    }
                    None => {
                        let subscriber = Subscriber { owner, contexts: registrations.collect() };
                        self.subscribers.insert(handle, subscriber);
                    }
                }
            }
            RouterMessage::UnregisterContexts { handle, kinds } => {
                if let Some(subscriber) = self.subscribers.get_mut(&handle) {
                    subscriber
                        .contexts
                        .retain(|registration| !kinds.contains(&registration.context.kind()));
                    if subscriber.contexts.is_empty() {
                        self.subscribers.remove(&handle);
                    }
                }
            }
            RouterMessage::UnregisterAll(handle) => {
                if self.subscribers.remove(&handle).is_some() {
                    debug!(%handle, "input contexts removed");
                }
            }
            RouterMessage::InputTick(tick) => self.on_tick(tick),
            RouterMessage::Count(reply) => {
                let _ = reply.send(self.context_count());
            }
        }
    }
}

/// Client-side view of the input router.
#[derive(Clone, Debug)]
pub struct RouterAddress(pub Address<RouterMessage>);

impl RouterAddress {
    pub fn register(&self, handle: EntityHandle, owner: Recipient<InputEvent>, contexts: Vec<InputContext>) {
        self.0.send(RouterMessage::RegisterContexts { handle, owner, contexts });
    }

    pub fn unregister(&self, handle: EntityHandle, kinds: Vec<ContextKind>) {
        self.0.send(RouterMessage::UnregisterContexts { handle, kinds });
    }

    pub fn unregister_all(&self, handle: EntityHandle) {
        self.0.send(RouterMessage::UnregisterAll(handle));
    }

    pub fn count(&self, timeout: std::time::Duration) -> Option<usize> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.0.send(RouterMessage::Count(tx));
        rx.recv_timeout(timeout).ok()
    }
}
