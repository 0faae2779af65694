use std::collections::BTreeSet;

use cipherscreen_identity::Identity;

use super::error::{ProtocolError, Role};

/// Administrators and admitted participants.
///
/// There is no participant removal: what happens to transactions already
/// submitted by a removed bank is undecided.
#[derive(Debug, Clone)]
pub struct ParticipantRegistry {
    administrators: BTreeSet<Identity>,
    participants: BTreeSet<Identity>,
}

impl ParticipantRegistry {
    pub fn new(administrators: impl IntoIterator<Item = Identity>) -> Result<Self, ProtocolError> {
        let administrators: BTreeSet<Identity> = administrators.into_iter().collect();
        if administrators.is_empty() {
            return Err(ProtocolError::LastAdministrator);
        }
        Ok(Self {
            administrators,
            participants: BTreeSet::new(),
        })
    }

    pub fn is_administrator(&self, identity: &Identity) -> bool {
        self.administrators.contains(identity)
    }

    pub fn is_admitted(&self, identity: &Identity) -> bool {
        self.participants.contains(identity)
    }

    pub fn require(&self, caller: &Identity, role: Role) -> Result<(), ProtocolError> {
        let holds = match role {
            Role::Administrator => self.is_administrator(caller),
            Role::Participant => self.is_admitted(caller),
        };
        if holds {
            Ok(())
        } else {
            Err(ProtocolError::Unauthorized {
                caller: *caller,
                role,
            })
        }
    }

    /// Returns `true` if `identity` was not admitted before.
    pub fn admit(&mut self, caller: &Identity, identity: Identity) -> Result<bool, ProtocolError> {
        self.require(caller, Role::Administrator)?;
        Ok(self.participants.insert(identity))
    }

    /// Returns `true` if `identity` was not an administrator before.
    pub fn add_administrator(
        &mut self,
        caller: &Identity,
        identity: Identity,
    ) -> Result<bool, ProtocolError> {
        self.require(caller, Role::Administrator)?;
        Ok(self.administrators.insert(identity))
    }

    /// Returns `true` if `identity` was an administrator.
    pub fn remove_administrator(
        &mut self,
        caller: &Identity,
        identity: &Identity,
    ) -> Result<bool, ProtocolError> {
        self.require(caller, Role::Administrator)?;
        if !self.administrators.contains(identity) {
            return Ok(false);
        }
        if self.administrators.len() == 1 {
            return Err(ProtocolError::LastAdministrator);
        }
        Ok(self.administrators.remove(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(b: u8) -> Identity {
        Identity([b; 32])
    }

    #[test]
    fn empty_administrator_set_is_rejected() {
        assert!(matches!(
            ParticipantRegistry::new(Vec::<Identity>::new()),
            Err(ProtocolError::LastAdministrator)
        ));
    }

    #[test]
    fn admit_is_idempotent_and_admin_only() {
        let mut reg = ParticipantRegistry::new([id(0)]).unwrap();

        assert!(reg.admit(&id(0), id(1)).unwrap());
        assert!(!reg.admit(&id(0), id(1)).unwrap());
        assert!(reg.is_admitted(&id(1)));

        assert!(matches!(
            reg.admit(&id(1), id(2)),
            Err(ProtocolError::Unauthorized {
                role: Role::Administrator,
                ..
            })
        ));
        assert!(!reg.is_admitted(&id(2)));
    }

    #[test]
    fn administrators_are_not_implicitly_participants() {
        let reg = ParticipantRegistry::new([id(0)]).unwrap();
        assert!(reg.is_administrator(&id(0)));
        assert!(!reg.is_admitted(&id(0)));
    }

    #[test]
    fn last_administrator_cannot_be_removed() {
        let mut reg = ParticipantRegistry::new([id(0)]).unwrap();
        assert!(matches!(
            reg.remove_administrator(&id(0), &id(0)),
            Err(ProtocolError::LastAdministrator)
        ));

        assert!(reg.add_administrator(&id(0), id(9)).unwrap());
        assert!(reg.remove_administrator(&id(9), &id(0)).unwrap());
        assert!(!reg.is_administrator(&id(0)));

        // The removed administrator has lost its powers
        assert!(reg.admit(&id(0), id(1)).is_err());
        // Removing a non-member is a no-op
        assert!(!reg.remove_administrator(&id(9), &id(5)).unwrap());
    }
}
