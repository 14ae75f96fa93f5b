//! Static protocol description: commands, events and enums per domain.

mod agent;
mod description;
mod signature;

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::debug;

use crate::codec::split_method;
use crate::errors::RegistrationError;

pub(crate) use agent::Agent;
pub use agent::EnumTable;
pub use description::{
    CommandDescription, DescriptionError, DomainDescription, EventDescription,
    ParameterDescription, ProtocolDescription, TypeDescription,
};
pub use signature::{CommandSignature, EventSchema, ParamSpec, TypeTag, Validation};

/// Tracing target for registration.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Everything registered about the protocol.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    agents: BTreeMap<String, Agent>,
    commands: HashMap<String, Rc<CommandSignature>>,
    events: HashMap<String, Rc<EventSchema>>,
}

impl Registry {
    pub(crate) fn register_command(
        &mut self,
        method: &str,
        params: Vec<ParamSpec>,
        reply_fields: Vec<String>,
    ) -> Result<(), RegistrationError> {
        let (domain, name) =
            split_method(method).ok_or_else(|| RegistrationError::invalid_method_name(method))?;
        let signature = Rc::new(CommandSignature::new(domain, name, params, reply_fields));

        debug!(
            target: REGISTRY_TARGET,
            method,
            params = signature.params().len(),
            "registering command"
        );

        self.agent_mut(domain).insert_command(Rc::clone(&signature));
        self.commands.insert(method.to_owned(), signature);
        Ok(())
    }

    pub(crate) fn register_enum(
        &mut self,
        type_name: &str,
        table: EnumTable,
    ) -> Result<(), RegistrationError> {
        let (domain, name) = split_method(type_name)
            .ok_or_else(|| RegistrationError::invalid_method_name(type_name))?;

        debug!(
            target: REGISTRY_TARGET,
            type_name,
            values = table.len(),
            "registering enum"
        );

        self.agent_mut(domain).insert_enum(name, table);
        Ok(())
    }

    pub(crate) fn register_event(
        &mut self,
        method: &str,
        param_order: Vec<String>,
    ) -> Result<(), RegistrationError> {
        let (domain, name) =
            split_method(method).ok_or_else(|| RegistrationError::invalid_method_name(method))?;

        debug!(
            target: REGISTRY_TARGET,
            method,
            params = param_order.len(),
            "registering event"
        );

        self.events.insert(
            method.to_owned(),
            Rc::new(EventSchema::new(domain, name, param_order)),
        );
        Ok(())
    }

    fn agent_mut(&mut self, domain: &str) -> &mut Agent {
        self.agents.entry(domain.to_owned()).or_default()
    }

    pub(crate) fn agent(&self, domain: &str) -> Option<&Agent> {
        self.agents.get(domain)
    }

    pub(crate) fn domains(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    pub(crate) fn command(&self, method: &str) -> Option<Rc<CommandSignature>> {
        self.commands.get(method).cloned()
    }

    pub(crate) fn event(&self, method: &str) -> Option<Rc<EventSchema>> {
        self.events.get(method).cloned()
    }
}
