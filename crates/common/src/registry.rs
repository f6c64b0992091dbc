// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

//! Static status registry: display data and side-effect policy per status code

use crate::types::{DisplayInfo, IconKind, SideEffectClass, StatusCode};

/// Get the display data for a status code
pub fn lookup(code: StatusCode) -> DisplayInfo {
    let (label, icon) = match code {
        StatusCode::Disconnected => ("Disconnected", IconKind::Circle),
        StatusCode::Connecting => ("Connecting...", IconKind::Pending),
        StatusCode::Connected => ("Connected", IconKind::Ok),
        StatusCode::Retrying => ("Reconnecting...", IconKind::Warn),
        StatusCode::Dropped => ("Connection Dropped", IconKind::Err),
        StatusCode::Denied => ("Access Denied", IconKind::Err),
        StatusCode::Unreachable => ("Server Unreachable", IconKind::Err),
        StatusCode::BadConfig => ("Invalid Configuration", IconKind::Alert),
        StatusCode::Error => ("System Error", IconKind::Err),
        StatusCode::Unknown => ("Error Connecting", IconKind::Question),
    };
    DisplayInfo { label, icon }
}

/// Get the side-effect class of a status code
pub fn side_effect_class(code: StatusCode) -> SideEffectClass {
    match code {
        StatusCode::Connected => SideEffectClass::Success,
        StatusCode::Retrying | StatusCode::Connecting => SideEffectClass::TransientWarning,
        StatusCode::Dropped
        | StatusCode::Denied
        | StatusCode::Unreachable
        | StatusCode::BadConfig
        | StatusCode::Error
        | StatusCode::Unknown => SideEffectClass::TerminalFailure,
        StatusCode::Disconnected => SideEffectClass::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_has_display_info() {
        for code in StatusCode::ALL {
            let info = lookup(code);
            assert!(!info.label.is_empty(), "empty label for {}", code);
        }
    }

    #[test]
    fn test_side_effect_classes() {
        assert_eq!(side_effect_class(StatusCode::Connected), SideEffectClass::Success);
        assert_eq!(
            side_effect_class(StatusCode::Connecting),
            SideEffectClass::TransientWarning
        );
        assert_eq!(
            side_effect_class(StatusCode::Retrying),
            SideEffectClass::TransientWarning
        );
        assert_eq!(
            side_effect_class(StatusCode::Disconnected),
            SideEffectClass::Neutral
        );

        let failures = StatusCode::ALL
            .into_iter()
            .filter(|c| side_effect_class(*c) == SideEffectClass::TerminalFailure)
            .count();
        assert_eq!(failures, 6);
    }

    #[test]
    fn test_only_connected_is_ok_icon() {
        for code in StatusCode::ALL {
            let is_ok = lookup(code).icon == IconKind::Ok;
            assert_eq!(is_ok, code.is_connected());
        }
    }
}
