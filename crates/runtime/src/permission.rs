use sqlx::types::Uuid;

use tavern_database::{
    Character, DiceRoll, GameSession, ParticipantRole, Repository, RepositoryResult,
};

use crate::{DomainError, Principal};

/// Everything a caller can ask to do, together with the resource at stake
/// and whatever context the rule needs (target user, roll author).
#[derive(Debug)]
pub enum Action<'a> {
    ViewSession { session: &'a GameSession },
    ListSessions,
    CreateSession,
    UpdateSession { session: &'a GameSession },
    DeleteSession { session: &'a GameSession },

    AddParticipant { session: &'a GameSession, target_user: Uuid },
    UpdateParticipantRole { session: &'a GameSession },
    RemoveParticipant { session: &'a GameSession, target_user: Uuid },
    ViewParticipants { session: &'a GameSession },

    RollDice { session: &'a GameSession },
    ViewRollHistory { session: &'a GameSession },
    ViewRoll { session: &'a GameSession, roll: &'a DiceRoll },

    CreateCharacter,
    ViewCharacter { character: &'a Character },
    UpdateCharacterIdentity { character: &'a Character },
    UpdateCharacterState { character: &'a Character },
    DeleteCharacter { character: &'a Character },

    ViewUser { target: Uuid },
    UpdateUser { target: Uuid },
    DeleteUser { target: Uuid },
    ListUsers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    Forbidden(&'static str),
}

impl From<DenyReason> for DomainError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => DomainError::Unauthenticated,
            DenyReason::Forbidden(what) => DomainError::Forbidden(what),
        }
    }
}

/// Outcome of a permission check. `AllowAsRole` is the narrowing case:
/// the request goes through, but with the effective role the resolver
/// picked instead of whatever the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    AllowAsRole(ParticipantRole),
    Deny(DenyReason),
}

impl Decision {
    pub fn require(self) -> Result<(), DomainError> {
        match self {
            Decision::Allow | Decision::AllowAsRole(_) => Ok(()),
            Decision::Deny(reason) => Err(reason.into()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        !matches!(self, Decision::Deny(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct SessionFlags {
    is_gm: bool,
    is_session_admin: bool,
    is_participant: bool,
}

/// Decides ALLOW or DENY for every action in the system, from relational
/// state read fresh on every call. Holds no mutable state of its own, so
/// concurrent requests can share it freely; what it can NOT give you is
/// atomicity with the write that follows; the repository's constraints
/// cover that.
pub struct PermissionResolver<'r> {
    repo: &'r dyn Repository,
}

impl<'r> PermissionResolver<'r> {
    pub fn new(repo: &'r dyn Repository) -> Self {
        Self { repo }
    }

    async fn session_flags(
        &self,
        principal: &Principal,
        session: &GameSession,
    ) -> RepositoryResult<SessionFlags> {
        let row = self.repo.find_participant(session.id, principal.id).await?;
        Ok(SessionFlags {
            is_gm: principal.id == session.gm_id,
            is_session_admin: row
                .as_ref()
                .is_some_and(|p| p.role == ParticipantRole::Admin),
            is_participant: row.is_some(),
        })
    }

    /// GM/admin standing on the session a character is attached to, if any.
    async fn attached_session_flags(
        &self,
        principal: &Principal,
        character: &Character,
    ) -> RepositoryResult<(bool, bool)> {
        let Some(session_id) = character.session_id else {
            return Ok((false, false));
        };
        match self.repo.find_session(session_id).await? {
            Some(session) => {
                let flags = self.session_flags(principal, &session).await?;
                Ok((flags.is_gm, flags.is_session_admin))
            }
            None => Ok((false, false)),
        }
    }

    pub async fn decide(
        &self,
        principal: Option<&Principal>,
        action: Action<'_>,
    ) -> RepositoryResult<Decision> {
        // Viewing a single session is open to the world, authenticated or
        // not. Listing them is not. Both on purpose.
        if let Action::ViewSession { .. } = action {
            return Ok(Decision::Allow);
        }

        let Some(principal) = principal else {
            return Ok(Decision::Deny(DenyReason::Unauthenticated));
        };

        let decision = match action {
            Action::ViewSession { .. } => Decision::Allow,
            Action::ListSessions => Decision::Allow,
            Action::CreateSession => Decision::Allow,
            Action::CreateCharacter => Decision::Allow,

            Action::UpdateSession { session } | Action::DeleteSession { session } => {
                let flags = self.session_flags(principal, session).await?;
                if flags.is_gm || flags.is_session_admin {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden(
                        "only the game-master or a session admin may do this",
                    ))
                }
            }

            Action::AddParticipant {
                session,
                target_user,
            } => {
                let flags = self.session_flags(principal, session).await?;
                let is_self = principal.id == target_user;
                if !(is_self || flags.is_gm || flags.is_session_admin) {
                    Decision::Deny(DenyReason::Forbidden(
                        "only the game-master, a session admin, or the user themselves may enroll",
                    ))
                } else if is_self && !flags.is_gm {
                    // self-enrollment can never pick an elevated role
                    Decision::AllowAsRole(ParticipantRole::Player)
                } else {
                    Decision::Allow
                }
            }

            Action::UpdateParticipantRole { session } => {
                let flags = self.session_flags(principal, session).await?;
                if flags.is_gm || flags.is_session_admin {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden(
                        "only the game-master or a session admin may change roles",
                    ))
                }
            }

            Action::RemoveParticipant {
                session,
                target_user,
            } => {
                let flags = self.session_flags(principal, session).await?;
                if flags.is_gm || flags.is_session_admin || principal.id == target_user {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden(
                        "only the game-master, a session admin, or the participant themselves may remove",
                    ))
                }
            }

            Action::ViewParticipants { session } | Action::ViewRollHistory { session } => {
                let flags = self.session_flags(principal, session).await?;
                if flags.is_gm || flags.is_participant || flags.is_session_admin {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden(
                        "only session members may view this",
                    ))
                }
            }

            Action::RollDice { session } => {
                let flags = self.session_flags(principal, session).await?;
                if flags.is_gm || flags.is_participant {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden(
                        "only session members may roll dice",
                    ))
                }
            }

            Action::ViewRoll { session, roll } => {
                let flags = self.session_flags(principal, session).await?;
                if flags.is_gm
                    || flags.is_participant
                    || flags.is_session_admin
                    || principal.id == roll.user_id
                {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden(
                        "only session members or the roller may view this roll",
                    ))
                }
            }

            Action::ViewCharacter { character }
            | Action::UpdateCharacterState { character } => {
                let is_owner = principal.id == character.owner_id;
                let (is_gm, is_admin) =
                    self.attached_session_flags(principal, character).await?;
                if is_owner || is_gm || is_admin {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden(
                        "only the owner or the attached session's staff may do this",
                    ))
                }
            }

            Action::UpdateCharacterIdentity { character } => {
                // name/race/class are locked tighter: a GM who is not also
                // a session admin may not rewrite someone else's character
                let is_owner = principal.id == character.owner_id;
                let (_, is_admin) =
                    self.attached_session_flags(principal, character).await?;
                if is_owner || is_admin {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden(
                        "only the owner or a session admin may change a character's identity",
                    ))
                }
            }

            Action::DeleteCharacter { character } => {
                // deletion wants the session-independent admin flag
                if principal.id == character.owner_id
                    || self.repo.user_holds_admin_role(principal.id).await?
                {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden(
                        "only the owner or an admin may delete a character",
                    ))
                }
            }

            Action::ViewUser { target }
            | Action::UpdateUser { target }
            | Action::DeleteUser { target } => {
                if principal.id == target
                    || self.repo.user_holds_admin_role(principal.id).await?
                {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden(
                        "only the account holder or an admin may do this",
                    ))
                }
            }

            Action::ListUsers => {
                if self.repo.user_holds_admin_role(principal.id).await? {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::Forbidden("only an admin may list users"))
                }
            }
        };

        Ok(decision)
    }
}
