//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::consts;

///
/// A negotiable Telnet option.
///
/// The option tables index by the raw byte so that options outside
/// this set still flow through the rejection path; `Unknown` carries
/// the original byte for that purpose.
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// [`consts::option::BINARY`] Binary Transmission [RFC856](https://tools.ietf.org/html/rfc856)
    TransmitBinary,
    /// [`consts::option::ECHO`] Echo [RFC857](https://tools.ietf.org/html/rfc857)
    Echo,
    /// [`consts::option::SGA`] Suppress Go Ahead [RFC858](https://tools.ietf.org/html/rfc858)
    SuppressGoAhead,
    /// [`consts::option::STATUS`] Status [RFC859](http://www.iana.org/go/rfc859)
    Status,
    /// [`consts::option::TM`] Timing Mark [RFC860](http://www.iana.org/go/rfc860)
    TimingMark,
    /// [`consts::option::LOGOUT`] Logout [RFC727](http://www.iana.org/go/rfc727)
    Logout,
    /// [`consts::option::SNDLOC`] Send Location [RFC779](http://www.iana.org/go/rfc779)
    SendLocation,
    /// [`consts::option::TTYPE`] Terminal Type [RFC1091](http://www.iana.org/go/rfc1091)
    TerminalType,
    /// [`consts::option::EOR`] End of Record [RFC885](http://www.iana.org/go/rfc885)
    EndOfRecord,
    /// [`consts::option::NAWS`] Negotiate About Window Size [RFC1073](http://www.iana.org/go/rfc1073)
    WindowSize,
    /// [`consts::option::TSPEED`] Terminal Speed [RFC1079](http://www.iana.org/go/rfc1079)
    TerminalSpeed,
    /// [`consts::option::LFLOW`] Remote Flow Control [RFC1372](http://www.iana.org/go/rfc1372)
    LineFlow,
    /// [`consts::option::LINEMODE`] Linemode [RFC1184](http://www.iana.org/go/rfc1184)
    Linemode,
    /// [`consts::option::XDISPLOC`] X Display Location [RFC1096](http://www.iana.org/go/rfc1096)
    XDisplayLocation,
    /// [`consts::option::NEW_ENVIRON`] New Environment [RFC1572](http://www.iana.org/go/rfc1572)
    NewEnviron,
    /// [`consts::option::CHARSET`] Charset [RFC2066](http://www.iana.org/go/rfc2066)
    Charset,
    /// [`consts::option::COM_PORT`] Com Port Control [RFC2217](http://www.iana.org/go/rfc2217)
    ComPort,
    /// [`consts::option::MSDP`] MUD Server Data Protocol [MSDP](https://tintin.sourceforge.io/protocols/msdp/)
    MSDP,
    /// [`consts::option::MSSP`] MUD Server Status Protocol [MSSP](https://tintin.sourceforge.io/protocols/mssp/)
    MSSP,
    /// [`consts::option::MSP`] MUD Sound Protocol
    MSP,
    /// [`consts::option::MXP`] MUD eXtension Protocol
    MXP,
    /// [`consts::option::ZMP`] Zenith MUD Protocol [ZMP](http://discworld.starturtle.net/external/protocols/zmp.html)
    ZMP,
    /// [`consts::option::AARDWOLF`] Aardwolf channel protocol
    Aardwolf,
    /// [`consts::option::ATCP`] Achaea Telnet Client Protocol
    ATCP,
    /// [`consts::option::GMCP`] Generic MUD Communication Protocol [GMCP](https://www.gammon.com.au/gmcp)
    GMCP,
    /// Any option outside the supported set.
    Unknown(u8),
}

impl TelnetOption {
    /// Converts this option to its wire byte.
    pub fn to_u8(self) -> u8 {
        match self {
            TelnetOption::TransmitBinary => consts::option::BINARY,
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::Status => consts::option::STATUS,
            TelnetOption::TimingMark => consts::option::TM,
            TelnetOption::Logout => consts::option::LOGOUT,
            TelnetOption::SendLocation => consts::option::SNDLOC,
            TelnetOption::TerminalType => consts::option::TTYPE,
            TelnetOption::EndOfRecord => consts::option::EOR,
            TelnetOption::WindowSize => consts::option::NAWS,
            TelnetOption::TerminalSpeed => consts::option::TSPEED,
            TelnetOption::LineFlow => consts::option::LFLOW,
            TelnetOption::Linemode => consts::option::LINEMODE,
            TelnetOption::XDisplayLocation => consts::option::XDISPLOC,
            TelnetOption::NewEnviron => consts::option::NEW_ENVIRON,
            TelnetOption::Charset => consts::option::CHARSET,
            TelnetOption::ComPort => consts::option::COM_PORT,
            TelnetOption::MSDP => consts::option::MSDP,
            TelnetOption::MSSP => consts::option::MSSP,
            TelnetOption::MSP => consts::option::MSP,
            TelnetOption::MXP => consts::option::MXP,
            TelnetOption::ZMP => consts::option::ZMP,
            TelnetOption::Aardwolf => consts::option::AARDWOLF,
            TelnetOption::ATCP => consts::option::ATCP,
            TelnetOption::GMCP => consts::option::GMCP,
            TelnetOption::Unknown(byte) => byte,
        }
    }

    /// Converts a wire byte to an option, mapping unassigned values to
    /// [`TelnetOption::Unknown`].
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::BINARY => TelnetOption::TransmitBinary,
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::STATUS => TelnetOption::Status,
            consts::option::TM => TelnetOption::TimingMark,
            consts::option::LOGOUT => TelnetOption::Logout,
            consts::option::SNDLOC => TelnetOption::SendLocation,
            consts::option::TTYPE => TelnetOption::TerminalType,
            consts::option::EOR => TelnetOption::EndOfRecord,
            consts::option::NAWS => TelnetOption::WindowSize,
            consts::option::TSPEED => TelnetOption::TerminalSpeed,
            consts::option::LFLOW => TelnetOption::LineFlow,
            consts::option::LINEMODE => TelnetOption::Linemode,
            consts::option::XDISPLOC => TelnetOption::XDisplayLocation,
            consts::option::NEW_ENVIRON => TelnetOption::NewEnviron,
            consts::option::CHARSET => TelnetOption::Charset,
            consts::option::COM_PORT => TelnetOption::ComPort,
            consts::option::MSDP => TelnetOption::MSDP,
            consts::option::MSSP => TelnetOption::MSSP,
            consts::option::MSP => TelnetOption::MSP,
            consts::option::MXP => TelnetOption::MXP,
            consts::option::ZMP => TelnetOption::ZMP,
            consts::option::AARDWOLF => TelnetOption::Aardwolf,
            consts::option::ATCP => TelnetOption::ATCP,
            consts::option::GMCP => TelnetOption::GMCP,
            byte => TelnetOption::Unknown(byte),
        }
    }

    /// Whether a positive reply to this option is followed by a
    /// sub-negotiation exchange that the negotiation engine should
    /// record as pending.
    pub fn needs_subnegotiation(self) -> bool {
        matches!(
            self,
            TelnetOption::TerminalType
                | TelnetOption::TerminalSpeed
                | TelnetOption::XDisplayLocation
                | TelnetOption::NewEnviron
                | TelnetOption::Charset
                | TelnetOption::WindowSize
                | TelnetOption::Linemode
                | TelnetOption::SendLocation
                | TelnetOption::LineFlow
        )
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::TransmitBinary => write!(f, "BINARY"),
            TelnetOption::Echo => write!(f, "ECHO"),
            TelnetOption::SuppressGoAhead => write!(f, "SGA"),
            TelnetOption::Status => write!(f, "STATUS"),
            TelnetOption::TimingMark => write!(f, "TM"),
            TelnetOption::Logout => write!(f, "LOGOUT"),
            TelnetOption::SendLocation => write!(f, "SNDLOC"),
            TelnetOption::TerminalType => write!(f, "TTYPE"),
            TelnetOption::EndOfRecord => write!(f, "EOR"),
            TelnetOption::WindowSize => write!(f, "NAWS"),
            TelnetOption::TerminalSpeed => write!(f, "TSPEED"),
            TelnetOption::LineFlow => write!(f, "LFLOW"),
            TelnetOption::Linemode => write!(f, "LINEMODE"),
            TelnetOption::XDisplayLocation => write!(f, "XDISPLOC"),
            TelnetOption::NewEnviron => write!(f, "NEW-ENVIRON"),
            TelnetOption::Charset => write!(f, "CHARSET"),
            TelnetOption::ComPort => write!(f, "COM-PORT"),
            TelnetOption::MSDP => write!(f, "MSDP"),
            TelnetOption::MSSP => write!(f, "MSSP"),
            TelnetOption::MSP => write!(f, "MSP"),
            TelnetOption::MXP => write!(f, "MXP"),
            TelnetOption::ZMP => write!(f, "ZMP"),
            TelnetOption::Aardwolf => write!(f, "AARDWOLF"),
            TelnetOption::ATCP => write!(f, "ATCP"),
            TelnetOption::GMCP => write!(f, "GMCP"),
            TelnetOption::Unknown(option) => write!(f, "Unknown({option})"),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_byte() {
        for byte in 0..=255u8 {
            assert_eq!(TelnetOption::from_u8(byte).to_u8(), byte);
        }
    }

    #[test]
    fn unknown_preserves_byte() {
        assert_eq!(TelnetOption::from_u8(76), TelnetOption::Unknown(76));
        assert_eq!(TelnetOption::Unknown(76).to_u8(), 76);
    }

    #[test]
    fn subnegotiation_followups() {
        assert!(TelnetOption::TerminalType.needs_subnegotiation());
        assert!(TelnetOption::Linemode.needs_subnegotiation());
        assert!(!TelnetOption::Echo.needs_subnegotiation());
        assert!(!TelnetOption::TransmitBinary.needs_subnegotiation());
    }
}
