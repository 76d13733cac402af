/// Connection phase. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Handshake,
    /// JS5 asset streaming. Terminal: the connection closes from here.
    AssetRequest,
    Login,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal phase transition {from:?} -> {to:?}")]
pub struct PhaseError {
    pub from: Phase,
    pub to: Phase,
}

impl Phase {
    pub fn can_advance_to(self, to: Phase) -> bool {
        matches!(
            (self, to),
            (Phase::Handshake, Phase::AssetRequest)
                | (Phase::Handshake, Phase::Login)
                | (Phase::Login, Phase::Authenticated)
        )
    }

    pub fn advance(&mut self, to: Phase) -> Result<(), PhaseError> {
        if !self.can_advance_to(to) {
            return Err(PhaseError { from: *self, to });
        }
        tracing::trace!(from = ?*self, to = ?to, "phase change");
        *self = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_path() {
        let mut phase = Phase::Handshake;
        phase.advance(Phase::Login).unwrap();
        phase.advance(Phase::Authenticated).unwrap();
        assert_eq!(phase, Phase::Authenticated);
    }

    #[test]
    fn never_rolls_back() {
        let mut phase = Phase::Authenticated;
        assert_eq!(
            phase.advance(Phase::Login),
            Err(PhaseError {
                from: Phase::Authenticated,
                to: Phase::Login
            })
        );
        assert_eq!(phase, Phase::Authenticated);

        let mut phase = Phase::AssetRequest;
        assert!(phase.advance(Phase::Login).is_err());
        assert!(phase.advance(Phase::Handshake).is_err());
    }

    #[test]
    fn no_skipping_login() {
        let mut phase = Phase::Handshake;
        assert!(phase.advance(Phase::Authenticated).is_err());
    }
}
