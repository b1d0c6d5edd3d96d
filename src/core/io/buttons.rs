// genesis-bus-rs/src/core/io/buttons.rs

//! Controller line and button bit definitions

use bitflags::bitflags;

/// Host key code bound to a controller button. 0 means unbound.
pub type KeyCode = u32;

/// Unbound key
pub const KEY_NONE: KeyCode = 0;

/// Maximum buttons per device (6-button pad)
pub const BTNI_MAX: usize = 12;

bitflags! {
    /// Controller port data pins (D0-D6)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IoPins: u8 {
        const UP = 0x01;
        const DOWN = 0x02;
        const LEFT = 0x04;
        const RIGHT = 0x08;
        const TL = 0x10;
        const TR = 0x20;
        const TH = 0x40;
    }
}

bitflags! {
    /// Digital pad buttons, one bit per button index.
    ///
    /// Layout:
    /// - 2-button: `??CBRLDU`
    /// - 3-button: `SACBRLDU`
    /// - 6-button: `????MXYZ SACBRLDU`
    ///
    /// Devices store these ACTIVE LOW (1 == released).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PadButtons: u32 {
        const UP = 0x001;
        const DOWN = 0x002;
        const LEFT = 0x004;
        const RIGHT = 0x008;
        const B = 0x010;
        const C = 0x020;
        const A = 0x040;
        const START = 0x080;
        const Z = 0x100;
        const Y = 0x200;
        const X = 0x400;
        const MODE = 0x800;
    }
}

bitflags! {
    /// Mega Mouse buttons, stored ACTIVE HIGH
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MouseButtons: u32 {
        const LEFT = 0x01;
        const RIGHT = 0x02;
        const MIDDLE = 0x04;
        const START = 0x08;
    }
}

bitflags! {
    /// Serial I/O control register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SerCtrl: u8 {
        /// TxdFull (1 == full)
        const TFUL = 0x01;
        /// RxdReady (1 == ready)
        const RRDY = 0x02;
        /// RxdError (1 == error)
        const RERR = 0x04;
        /// Rxd interrupt enable
        const RINT = 0x08;
        /// TL as serial out
        const SOUT = 0x10;
        /// TR as serial in
        const SIN = 0x20;
        const BPS0 = 0x40;
        const BPS1 = 0x80;
    }
}

impl SerCtrl {
    /// Status bits the CPU cannot write
    pub const STATUS: SerCtrl = SerCtrl::TFUL.union(SerCtrl::RRDY).union(SerCtrl::RERR);
}
