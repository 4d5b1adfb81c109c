//! The canonical prefix entity the trie operates on, and its conversions
//! to/from the host platform's `inetnum::addr::Prefix`.

use std::fmt;

use crate::error::BartError;
use crate::family::AddressFamily;

/// A canonical `(address, bit-length)` pair for one address family.
///
/// `Prefix::new` always masks the address to `len` bits, so every
/// `Prefix` in circulation is canonical by construction; nothing
/// downstream needs to re-mask.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Prefix<AF: AddressFamily> {
    addr: AF,
    len: u8,
}

impl<AF: AddressFamily> Prefix<AF> {
    /// Builds a canonical prefix, masking `addr` to `len` bits.
    ///
    /// Returns `Err(BartError::InvalidPrefixLength)` if `len` exceeds
    /// the family's bit width; this is the one input error the engine
    /// reports rather than silently absorbing.
    pub fn new(addr: AF, len: u8) -> Result<Self, BartError> {
        if len > AF::BITS {
            return Err(BartError::InvalidPrefixLength);
        }
        Ok(Prefix {
            addr: addr.mask(len),
            len,
        })
    }

    /// Builds a prefix without re-validating or re-masking `addr`.
    /// Callers must guarantee `addr` is already masked to `len` bits and
    /// `len <= AF::BITS`; used internally when reconstructing a prefix
    /// from a compressed leaf/fringe, where both invariants already
    /// hold.
    pub(crate) fn new_unchecked(addr: AF, len: u8) -> Self {
        debug_assert!(len <= AF::BITS);
        debug_assert_eq!(addr, addr.mask(len));
        Prefix { addr, len }
    }

    pub fn addr(&self) -> AF {
        self.addr
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_default(&self) -> bool {
        self.len == 0
    }

    /// The octet the trie consumes at `depth` (0-based).
    pub(crate) fn octet(&self, depth: usize) -> u8 {
        self.addr.octet(depth)
    }

    /// `true` iff this prefix's range fully contains `addr`.
    pub fn contains(&self, addr: AF) -> bool {
        addr.mask(self.len) == self.addr
    }

    /// `true` iff the two prefixes' address ranges intersect, i.e. one
    /// is contained in the other (equal prefixes count as overlapping).
    pub fn overlaps(&self, other: &Prefix<AF>) -> bool {
        let shorter = self.len.min(other.len);
        self.addr.mask(shorter) == other.addr.mask(shorter)
    }
}

impl<AF: AddressFamily> fmt::Display for Prefix<AF> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr.to_ip_addr(), self.len)
    }
}

impl<AF: AddressFamily> fmt::Debug for Prefix<AF> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prefix({}/{})", self.addr.to_ip_addr(), self.len)
    }
}

impl<AF: AddressFamily> TryFrom<inetnum::addr::Prefix> for Prefix<AF> {
    type Error = BartError;

    fn try_from(value: inetnum::addr::Prefix) -> Result<Self, Self::Error> {
        let addr = AF::from_ip_addr(value.addr()).ok_or(BartError::InvalidPrefixLength)?;
        Prefix::new(addr, value.len())
    }
}

impl<AF: AddressFamily> From<Prefix<AF>> for inetnum::addr::Prefix {
    fn from(value: Prefix<AF>) -> Self {
        // A `Prefix<AF>` is always within its family's valid bit range,
        // so this construction cannot fail.
        inetnum::addr::Prefix::new(value.addr.to_ip_addr(), value.len)
            .expect("Prefix<AF> invariants guarantee a valid inetnum::addr::Prefix")
    }
}
