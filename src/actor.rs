//! Mailbox runtime.
//!
//! Every component runs on its own named thread and owns its state outright.
//! Messages arrive through an unbounded channel and are handled one at a time,
//! so component state needs no locks. Sends never block the sender.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, trace};

use crate::error::SpawnError;

enum Envelope<M> {
    Message(M),
    Stop,
}

/// A component with a private sequential mailbox.
pub trait Actor: Send + 'static {
    type Message: Send + 'static;

    fn name(&self) -> &'static str;

    /// Runs on the actor thread before the first message.
    fn started(&mut self, _ctx: &Context<Self::Message>) {}

    fn handle(&mut self, msg: Self::Message, ctx: &Context<Self::Message>);

    /// Runs on the actor thread after the last message.
    fn stopped(&mut self) {}
}

/// Handed to an actor while it runs. Gives access to its own address.
pub struct Context<M> {
    address: Address<M>,
}

impl<M: Send + 'static> Context<M> {
    pub fn address(&self) -> &Address<M> {
        &self.address
    }

    /// Ends the loop once the messages already queued have been handled.
    pub fn stop(&self) {
        self.address.stop();
    }
}

/// Sending half of a mailbox.
pub struct Address<M> {
    name: &'static str,
    tx: Sender<Envelope<M>>,
}

impl<M> Clone for Address<M> {
    fn clone(&self) -> Self {
        Self { name: self.name, tx: self.tx.clone() }
    }
}

impl<M> fmt::Debug for Address<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address").field("name", &self.name).finish()
    }
}

impl<M: Send + 'static> Address<M> {
    /// Fire-and-forget. Returns false when the actor has already shut down.
    pub fn send(&self, msg: M) -> bool {
        let delivered = self.tx.send(Envelope::Message(msg)).is_ok();
        if !delivered {
            trace!(actor = self.name, "dropping message for stopped actor");
        }
        delivered
    }

    pub fn stop(&self) {
        let _ = self.tx.send(Envelope::Stop);
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type-erased sink for any payload this actor's message type can be built from.
    pub fn recipient<T>(&self) -> Recipient<T>
    where
        M: From<T>,
        T: Send + 'static,
    {
        let address = self.clone();
        Recipient {
            name: self.name,
            deliver: Arc::new(move |value: T| address.send(M::from(value))),
        }
    }
}

/// Address of some actor that accepts `T`, without naming the actor's message type.
pub struct Recipient<T> {
    name: &'static str,
    deliver: Arc<dyn Fn(T) -> bool + Send + Sync>,
}

impl<T> Clone for Recipient<T> {
    fn clone(&self) -> Self {
        Self { name: self.name, deliver: Arc::clone(&self.deliver) }
    }
}

impl<T> fmt::Debug for Recipient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipient").field("name", &self.name).finish()
    }
}

impl<T> Recipient<T> {
    /// Builds a recipient from a plain closure. Handy for tests and adapters.
    pub fn from_fn(name: &'static str, deliver: impl Fn(T) -> bool + Send + Sync + 'static) -> Self {
        Self { name, deliver: Arc::new(deliver) }
    }

    /// Recipient that forwards into a channel.
    pub fn from_sender(name: &'static str, tx: Sender<T>) -> Self
    where
        T: Send + 'static,
    {
        Self::from_fn(name, move |value| tx.send(value).is_ok())
    }

    pub fn send(&self, value: T) -> bool {
        (self.deliver)(value)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Join handle for a spawned actor.
pub struct ActorHandle {
    name: &'static str,
    join: Option<JoinHandle<()>>,
}

impl ActorHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits for the actor thread to finish. A panicked actor is logged, not propagated.
    pub fn join(mut self) {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!(actor = self.name, "actor thread panicked");
            }
        }
    }
}

/// Starts `actor` on its own thread and returns its address.
pub fn spawn<A: Actor>(mut actor: A) -> Result<(Address<A::Message>, ActorHandle), SpawnError> {
    let name = actor.name();
    let (tx, rx) = crossbeam_channel::unbounded::<Envelope<A::Message>>();
    let address = Address { name, tx };
    let ctx = Context { address: address.clone() };

    let join = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            info!(actor = name, "started");
            actor.started(&ctx);
            run_mailbox(&mut actor, &rx, &ctx);
            actor.stopped();
            info!(actor = name, "stopped");
        })
        .map_err(|source| SpawnError::Thread { name, source })?;

    Ok((address, ActorHandle { name, join: Some(join) }))
}

fn run_mailbox<A: Actor>(actor: &mut A, rx: &Receiver<Envelope<A::Message>>, ctx: &Context<A::Message>) {
    // The context holds a sender too, so disconnection alone never ends the loop;
    // termination always goes through an explicit stop marker.
    while let Ok(envelope) = rx.recv() {
        match envelope {
            Envelope::Message(msg) => actor.handle(msg, ctx),
            Envelope::Stop => {
                debug!(actor = actor.name(), pending = rx.len(), "stop requested");
                break;
            }
        }
    }
}
