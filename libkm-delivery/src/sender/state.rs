// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sender transition table.
//!
//! `transition` is pure: it names the side effect and the controller
//! performs it against the archive.

use crate::transport::DeliveryOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderState {
    #[default]
    Ready,
    /// A drain worker owns the queue head.
    Sending,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderAction {
    /// Someone asked for the queue to be drained. `queued` is the current
    /// queue length.
    Start { queued: usize },
    /// The in-flight request finished.
    Delivered { outcome: DeliveryOutcome },
    /// The head was consumed; `queued` is what is left.
    Advance { queued: usize },
    Disable,
    Enable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderEffect {
    /// Spawn a drain worker for the current head.
    StartDrain,
    /// Keep the current drain worker going with the new head.
    SendNext,
    RemoveHead,
    ClearQueue,
}

pub fn transition(
    state: SenderState,
    action: SenderAction,
) -> (SenderState, Option<SenderEffect>) {
    use SenderAction::*;
    use SenderEffect::*;
    use SenderState::*;

    match (state, action) {
        (Ready, Start { queued: 0 }) => (Ready, None),
        (Ready, Start { .. }) => (Sending, Some(StartDrain)),

        (Sending, Delivered { outcome }) => match outcome {
            DeliveryOutcome::Success => (Sending, Some(RemoveHead)),
            DeliveryOutcome::Malformed => (Ready, Some(RemoveHead)),
            DeliveryOutcome::Failure => (Ready, None),
        },
        (Sending, Advance { queued: 0 }) => (Ready, None),
        (Sending, Advance { .. }) => (Sending, Some(SendNext)),

        (Ready | Sending, Disable) => (Disabled, Some(ClearQueue)),
        (Disabled, Enable) => (Ready, None),

        // Start while sending or disabled, completions that arrive after the
        // drain was abandoned, redundant enable/disable.
        (state, _) => (state, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeliveryOutcome::*;
    use SenderAction::*;
    use SenderEffect::*;
    use SenderState::*;

    #[test]
    fn test_start() {
        assert_eq!(transition(Ready, Start { queued: 0 }), (Ready, None));
        assert_eq!(transition(Ready, Start { queued: 3 }), (Sending, Some(StartDrain)));
        assert_eq!(transition(Sending, Start { queued: 3 }), (Sending, None));
        assert_eq!(transition(Disabled, Start { queued: 3 }), (Disabled, None));
    }

    #[test]
    fn test_delivery_results() {
        assert_eq!(
            transition(Sending, Delivered { outcome: Success }),
            (Sending, Some(RemoveHead))
        );
        assert_eq!(
            transition(Sending, Delivered { outcome: Malformed }),
            (Ready, Some(RemoveHead))
        );
        assert_eq!(transition(Sending, Delivered { outcome: Failure }), (Ready, None));
    }

    #[test]
    fn test_advance() {
        assert_eq!(transition(Sending, Advance { queued: 2 }), (Sending, Some(SendNext)));
        assert_eq!(transition(Sending, Advance { queued: 0 }), (Ready, None));
    }

    #[test]
    fn test_late_completions_are_discarded() {
        for outcome in [Success, Failure, Malformed] {
            assert_eq!(transition(Disabled, Delivered { outcome }), (Disabled, None));
            assert_eq!(transition(Ready, Delivered { outcome }), (Ready, None));
        }
        assert_eq!(transition(Disabled, Advance { queued: 1 }), (Disabled, None));
    }

    #[test]
    fn test_enable_disable() {
        assert_eq!(transition(Ready, Disable), (Disabled, Some(ClearQueue)));
        assert_eq!(transition(Sending, Disable), (Disabled, Some(ClearQueue)));
        assert_eq!(transition(Disabled, Disable), (Disabled, None));
        assert_eq!(transition(Disabled, Enable), (Ready, None));
        assert_eq!(transition(Ready, Enable), (Ready, None));
        assert_eq!(transition(Sending, Enable), (Sending, None));
    }
}
