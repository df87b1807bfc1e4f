//! IPv4 CIDRブロック
//!
//! ネットワークとサブネットのアドレス範囲を表現し、サブネット分割を行います。

use crate::error::{Result, StackError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// IPv4のアドレス範囲（例: 10.0.0.0/16）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// すべてのIPv4アドレス (0.0.0.0/0)
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        addr: Ipv4Addr::UNSPECIFIED,
        prefix: 0,
    };

    /// 検証済みの定数を組み立てる
    pub(crate) const fn from_octets(a: u8, b: u8, c: u8, d: u8, prefix: u8) -> Self {
        Self {
            addr: Ipv4Addr::new(a, b, c, d),
            prefix,
        }
    }

    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(StackError::InvalidCidr(format!(
                "{}/{}: プレフィックス長は32以下である必要があります",
                addr, prefix
            )));
        }
        if u32::from(addr) & !mask(prefix) != 0 {
            return Err(StackError::InvalidCidr(format!(
                "{}/{}: ホスト部が0ではありません",
                addr, prefix
            )));
        }
        Ok(Self { addr, prefix })
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// ブロック内のアドレス数
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    /// `new_prefix` の大きさで分割したときの `index` 番目のブロック
    pub fn subnet(&self, new_prefix: u8, index: u32) -> Result<Self> {
        if new_prefix < self.prefix || new_prefix > 32 {
            return Err(StackError::InvalidCidr(format!(
                "{} を /{} に分割できません",
                self, new_prefix
            )));
        }

        let count = 1u64 << u32::from(new_prefix - self.prefix);
        if u64::from(index) >= count {
            return Err(StackError::IndexOutOfRange {
                index: index as usize,
                len: count as usize,
            });
        }

        let block = 1u64 << (32 - u32::from(new_prefix));
        let base = u64::from(u32::from(self.addr)) + u64::from(index) * block;
        Self::new(Ipv4Addr::from(base as u32), new_prefix)
    }

    /// `other` がこのブロックに完全に含まれるか
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix
            && u32::from(other.addr) & mask(self.prefix) == u32::from(self.addr)
    }

    /// アドレスがこのブロック内にあるか
    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & mask(self.prefix) == u32::from(self.addr)
    }

    /// ブロック内の `offset` 番目のアドレス
    pub fn host(&self, offset: u32) -> Option<Ipv4Addr> {
        if u64::from(offset) >= self.size() {
            return None;
        }
        Some(Ipv4Addr::from(u32::from(self.addr) + offset))
    }
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| StackError::InvalidCidr(format!("{}: '/' がありません", s)))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| StackError::InvalidCidr(format!("{}: アドレスが不正です", s)))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| StackError::InvalidCidr(format!("{}: プレフィックスが不正です", s)))?;
        Self::new(addr, prefix)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = StackError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}
