//! Opaque identity types shared across the host/backend boundary.
//!
//! The coordinator never dereferences a host object directly; it only
//! ever holds these small `Copy` identities and asks the [`Host`][crate::host::Host]
//! to resolve them. This is what lets [`Unit`][crate::unit::Unit] hold a
//! "weak" iseq reference without a real weak pointer: the identity simply
//! outlives the question of whether the iseq behind it is still alive.

/// Identity of an iseq, as seen by the coordinator.
///
/// The host is free to choose any stable representation (an index into
/// its own iseq table, a tagged pointer cast to `u64`, ...). The
/// coordinator treats it as an opaque key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IseqId(pub u64);

/// Monotonically assigned identity for a compilation [`Unit`][crate::unit::Unit].
///
/// Every unit's id is strictly greater than that of every previously
/// created unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u64);

/// Identity of a class/module used as a guard key by generated code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassSerial(pub u32);
