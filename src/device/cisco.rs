//! Cisco device configurations.

use super::{DeviceConfig, SshAlgorithms};

/// Cisco device variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CiscoVariant {
    #[default]
    Ios,
    IosXe,
    IosXr,
    NxOs,
    Asa,
    Wlc,
    IosLegacy,
}

impl CiscoVariant {
    pub const ALL: [CiscoVariant; 7] = [
        Self::Ios,
        Self::IosXe,
        Self::IosXr,
        Self::NxOs,
        Self::Asa,
        Self::Wlc,
        Self::IosLegacy,
    ];

    /// The netmiko `device_type` name of this variant.
    pub fn device_type(self) -> &'static str {
        match self {
            Self::Ios => "cisco_ios",
            Self::IosXe => "cisco_xe",
            Self::IosXr => "cisco_xr",
            Self::NxOs => "cisco_nxos",
            Self::Asa => "cisco_asa",
            Self::Wlc => "cisco_wlc",
            Self::IosLegacy => "cisco_ios_legacy",
        }
    }

    /// Looks a variant up by its netmiko `device_type` name. `cisco_wlc_ssh`
    /// is accepted as an alias.
    pub fn from_device_type(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name == "cisco_wlc_ssh" {
            return Some(Self::Wlc);
        }
        Self::ALL
            .into_iter()
            .find(|variant| variant.device_type() == name)
    }

    pub fn into_config(self) -> DeviceConfig {
        match self {
            Self::Ios | Self::IosXe => Self::ios_config(),
            Self::IosXr => Self::ios_xr_config(),
            Self::NxOs => Self::nxos_config(),
            Self::Asa => Self::asa_config(),
            Self::Wlc => Self::wlc_config(),
            Self::IosLegacy => Self::ios_config().ssh_algorithms(Self::legacy_algorithms()),
        }
    }

    fn ios_config() -> DeviceConfig {
        DeviceConfig::with_prompt(r"[\r\n][\w\-\.]+[#>]\s*$")
            .add_disable_paging_command("terminal length 0")
            .add_disable_paging_command("terminal width 512")
            .add_error_pattern(r"% Invalid")
            .add_error_pattern(r"% Incomplete")
            .add_error_pattern(r"% Ambiguous")
            .add_error_pattern(r"% Unknown")
    }

    fn ios_xr_config() -> DeviceConfig {
        DeviceConfig::with_prompt(r"[\r\n][\w\-\.:\/]+[#>]\s*$")
            .add_disable_paging_command("terminal length 0")
            .add_disable_paging_command("terminal width 512")
            .add_error_pattern(r"% Invalid")
            .add_error_pattern(r"% Incomplete")
            .add_error_pattern(r"% Ambiguous")
            .add_error_pattern(r"% Failed")
    }

    fn nxos_config() -> DeviceConfig {
        DeviceConfig::with_prompt(r"[\r\n][\w\-\.]+[#>]\s*$")
            .add_disable_paging_command("terminal length 0")
            .add_disable_paging_command("terminal width 511")
            .add_error_pattern(r"% Invalid")
            .add_error_pattern(r"% Incomplete")
            .add_error_pattern(r"% Ambiguous")
            .add_error_pattern(r"Syntax error")
    }

    fn asa_config() -> DeviceConfig {
        DeviceConfig::with_prompt(r"[\r\n][\w\-\.\/]+[#>]\s*$")
            .add_disable_paging_command("terminal pager 0")
            .add_error_pattern(r"ERROR:")
            .add_error_pattern(r"% Invalid")
            .add_error_pattern(r"% Incomplete")
    }

    fn wlc_config() -> DeviceConfig {
        // (Cisco Controller) >
        DeviceConfig::with_prompt(r"[\r\n]\([^\)]+\)\s*[#>]\s*$")
            .add_disable_paging_command("config paging disable")
            .add_error_pattern(r"Incorrect usage")
            .add_error_pattern(r"Invalid")
    }

    /// Old IOS images (and GNS3 lab images) only offer SHA1 key exchange and
    /// CBC ciphers.
    fn legacy_algorithms() -> SshAlgorithms {
        SshAlgorithms::new()
            .kex(vec![
                russh::kex::DH_G14_SHA1,
                russh::kex::DH_G1_SHA1,
                russh::kex::DH_GEX_SHA1,
            ])
            .cipher(vec![
                russh::cipher::AES_256_CBC,
                russh::cipher::AES_192_CBC,
                russh::cipher::AES_128_CBC,
                russh::cipher::AES_256_CTR,
                russh::cipher::AES_128_CTR,
            ])
            .mac(vec![russh::mac::HMAC_SHA1])
    }
}

impl std::fmt::Display for CiscoVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ios => write!(f, "Cisco IOS"),
            Self::IosXe => write!(f, "Cisco IOS-XE"),
            Self::IosXr => write!(f, "Cisco IOS-XR"),
            Self::NxOs => write!(f, "Cisco NX-OS"),
            Self::Asa => write!(f, "Cisco ASA"),
            Self::Wlc => write!(f, "Cisco WLC"),
            Self::IosLegacy => write!(f, "Cisco IOS (Legacy)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_names_round_trip() {
        for variant in CiscoVariant::ALL {
            assert_eq!(CiscoVariant::from_device_type(variant.device_type()), Some(variant));
        }
        assert_eq!(CiscoVariant::from_device_type("CISCO_IOS"), Some(CiscoVariant::Ios));
        assert_eq!(CiscoVariant::from_device_type("cisco_wlc_ssh"), Some(CiscoVariant::Wlc));
        assert_eq!(CiscoVariant::from_device_type("arista_eos"), None);
    }

    #[test]
    fn only_legacy_overrides_algorithms() {
        assert!(CiscoVariant::Ios.into_config().ssh_algorithms.is_none());
        let legacy = CiscoVariant::IosLegacy.into_config();
        assert_eq!(legacy.prompt_pattern, CiscoVariant::Ios.into_config().prompt_pattern);
        assert!(legacy.ssh_algorithms.is_some());
    }

    #[test]
    fn asa_uses_pager_instead_of_terminal_length() {
        let asa = CiscoVariant::Asa.into_config();
        assert_eq!(asa.disable_paging_commands, vec!["terminal pager 0".to_string()]);
    }
}
