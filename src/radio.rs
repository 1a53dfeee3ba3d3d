//! Radio classification and operator parsing.
//!
//! The platform reports network and phone types as bare integer codes and the
//! carrier as a `mccmnc` digit string. Everything here turns those into typed
//! values or rejects them.

use std::{fmt, str::FromStr};

use serde::Serialize;
use strum::{AsRefStr, FromRepr};

use crate::error::{Result, ScanError};

/// Radio technology of a single cell reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CellRadio {
    Gsm,
    Umts,
    Cdma,
    Lte,
}

/// Top level radio technology of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RadioFamily {
    Gsm,
    Cdma,
    Wcdma,
}

/// Platform network type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i32)]
pub enum NetworkType {
    Unknown = 0,
    Gprs = 1,
    Edge = 2,
    Umts = 3,
    Cdma = 4,
    Evdo0 = 5,
    EvdoA = 6,
    OneXRtt = 7,
    Hsdpa = 8,
    Hsupa = 9,
    Hspa = 10,
    Iden = 11,
    EvdoB = 12,
    Lte = 13,
    Ehrpd = 14,
    Hspap = 15,
}

impl NetworkType {
    /// Human readable label, used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            NetworkType::Unknown => "UNKNOWN",
            NetworkType::Gprs => "GPRS",
            NetworkType::Edge => "EDGE",
            NetworkType::Umts => "UMTS",
            NetworkType::Cdma => "CDMA",
            NetworkType::Evdo0 => "CDMA - EvDo rev. 0",
            NetworkType::EvdoA => "CDMA - EvDo rev. A",
            NetworkType::OneXRtt => "CDMA - 1xRTT",
            NetworkType::Hsdpa => "HSDPA",
            NetworkType::Hsupa => "HSUPA",
            NetworkType::Hspa => "HSPA",
            NetworkType::Iden => "iDEN",
            NetworkType::EvdoB => "CDMA - EvDo rev. B",
            NetworkType::Lte => "LTE",
            NetworkType::Ehrpd => "CDMA - eHRPD",
            NetworkType::Hspap => "HSPA+",
        }
    }
}

/// Platform phone type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i32)]
pub enum PhoneType {
    None = 0,
    Gsm = 1,
    Cdma = 2,
    Sip = 3,
}

/// Maps a network type code to the radio of a cell reading.
///
/// CDMA variants are returned as [`CellRadio::Cdma`]. Earlier clients raised an
/// error for them even though they were matched, which dropped every reading
/// on CDMA networks. iDEN and unknown codes are still rejected.
pub fn classify_network_type(code: i32) -> Result<CellRadio> {
    let Some(network_type) = NetworkType::from_repr(code) else {
        return Err(ScanError::UnsupportedNetworkType {
            code,
            name: format!("UNKNOWN ({code})"),
        });
    };

    match network_type {
        NetworkType::Gprs | NetworkType::Edge => Ok(CellRadio::Gsm),
        NetworkType::Umts
        | NetworkType::Hsdpa
        | NetworkType::Hsupa
        | NetworkType::Hspa
        | NetworkType::Hspap => Ok(CellRadio::Umts),
        NetworkType::Lte => Ok(CellRadio::Lte),
        NetworkType::Cdma
        | NetworkType::Evdo0
        | NetworkType::EvdoA
        | NetworkType::EvdoB
        | NetworkType::OneXRtt
        | NetworkType::Ehrpd => Ok(CellRadio::Cdma),
        NetworkType::Iden => Err(ScanError::UnsupportedNetworkType {
            code,
            name: network_type.label().to_owned(),
        }),
        NetworkType::Unknown => Err(ScanError::UnsupportedNetworkType {
            code,
            name: format!("UNKNOWN ({code})"),
        }),
    }
}

/// Maps a phone type code to the device radio family.
///
/// Phones without a radio (none, SIP) are rejected.
pub fn radio_family(phone_type: i32) -> Result<RadioFamily> {
    match PhoneType::from_repr(phone_type) {
        Some(PhoneType::Gsm) => Ok(RadioFamily::Gsm),
        Some(PhoneType::Cdma) => Ok(RadioFamily::Cdma),
        Some(PhoneType::None) | Some(PhoneType::Sip) | None => {
            Err(ScanError::UnsupportedPhoneType(phone_type))
        }
    }
}

/// Carrier identifier split into country and network codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkOperator {
    pub mcc: u16,
    pub mnc: u32,
    // leading zeros are significant: "42501" and "425001" are different networks
    mnc_digits: u8,
}

impl NetworkOperator {
    pub fn parse(mcc_mnc: Option<&str>) -> Result<Self> {
        let invalid = || ScanError::InvalidOperatorFormat(mcc_mnc.map(str::to_owned));

        let s = mcc_mnc.ok_or_else(invalid)?;
        if !(5..=8).contains(&s.len()) || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let (mcc, mnc) = s.split_at(3);
        Ok(Self {
            mcc: mcc.parse().map_err(|_| invalid())?,
            mnc: mnc.parse().map_err(|_| invalid())?,
            mnc_digits: mnc.len() as u8,
        })
    }
}

impl FromStr for NetworkOperator {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(Some(s))
    }
}

impl fmt::Display for NetworkOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:03}{:0width$}",
            self.mcc,
            self.mnc,
            width = self.mnc_digits as usize
        )
    }
}
