//! C entry points
//!
//! All `hcp_*` calls except [`hcp_hp_poll`] only touch the shared
//! region through atomics and may be called from any task. The region
//! they use is the application core's own one, or the coprocessor's
//! once [`hcp_lp_attach`] has been called.
//!
//! Exactly one agent drives the bus: after a successful `hcp_hp_init`
//! the coprocessor region can no longer be attached, and the other way
//! round.

use core::ffi::c_void;
use core::ptr;

use portable_atomic::{AtomicPtr, Ordering};
use static_cell::StaticCell;

use hcp_core::{BridgeFacade, BridgeSnapshot, CoreMode, SharedRegion, TimingConfig};

use crate::bridge::HpBridge;
use crate::hal::HcpHalC;

/// Region used by the application-core agent
static REGION: SharedRegion = SharedRegion::new();

static BRIDGE: StaticCell<HpBridge<'static>> = StaticCell::new();

static SELECTION: AgentSelection = AgentSelection::new();

/// Which agent owns the bus
struct AgentSelection {
    /// Set once by `hcp_hp_init`; only `hcp_hp_poll` dereferences it
    bridge: AtomicPtr<HpBridge<'static>>,
    /// Region the host calls read and write; null means [`REGION`]
    region: AtomicPtr<SharedRegion>,
}

impl AgentSelection {
    const fn new() -> Self {
        Self {
            bridge: AtomicPtr::new(ptr::null_mut()),
            region: AtomicPtr::new(ptr::null_mut()),
        }
    }

    fn low_power_attached(&self) -> bool {
        !self.region.load(Ordering::Acquire).is_null()
    }

    fn high_performance_running(&self) -> bool {
        !self.bridge.load(Ordering::Acquire).is_null()
    }

    /// Record the running bridge; refused once either agent is selected
    fn start_high_performance(&self, bridge: *mut HpBridge<'static>) -> bool {
        if bridge.is_null() || self.low_power_attached() {
            return false;
        }
        self.bridge
            .compare_exchange(ptr::null_mut(), bridge, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Route host calls to `region`; refused while the bridge runs
    fn attach_low_power(&self, region: *mut SharedRegion) -> bool {
        if region.is_null() || self.high_performance_running() {
            return false;
        }
        self.region.store(region, Ordering::Release);
        true
    }
}

/// Door status as seen by C code
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HcpStatus {
    /// 0 (closed) to 200 (open)
    pub position: u8,
    pub target: u8,
    /// 0 idle, 1 opening, 2 closing, 3 error, 4 unknown
    pub state: u8,
    /// Raw drive state code
    pub code: u8,
    pub light_on: bool,
    pub connected: bool,
    /// False until the first status broadcast has been decoded
    pub valid: bool,
}

impl From<BridgeSnapshot> for HcpStatus {
    fn from(snapshot: BridgeSnapshot) -> Self {
        let status = snapshot.status;
        Self {
            position: status.position,
            target: status.target,
            state: status.state.to_u8(),
            code: status.code.to_byte(),
            light_on: status.light_on,
            connected: snapshot.connected,
            valid: snapshot.valid,
        }
    }
}

fn region() -> &'static SharedRegion {
    let attached = SELECTION.region.load(Ordering::Acquire);
    if attached.is_null() {
        &REGION
    } else {
        // SAFETY: only set by hcp_lp_attach, whose caller guarantees the
        // region stays mapped for the program's lifetime
        unsafe { &*attached }
    }
}

fn facade() -> BridgeFacade<'static> {
    BridgeFacade::new(region())
}

/// Start the application-core agent
///
/// `poll_interval_ms` of 0 selects the default. Returns false if the
/// table is null, the interval is unusable, the agent already runs, or
/// the coprocessor region has been attached.
///
/// # Safety
/// `hal` must point to a valid table whose functions and context stay
/// valid for the program's lifetime.
#[no_mangle]
pub unsafe extern "C" fn hcp_hp_init(hal: *const HcpHalC, poll_interval_ms: u32) -> bool {
    let Some(table) = (unsafe { hal.as_ref() }) else {
        return false;
    };

    let mut timing = TimingConfig::for_mode(CoreMode::HighPerformance);
    if poll_interval_ms != 0 {
        timing.poll_interval_ms = poll_interval_ms;
    }
    if timing.validate().is_err() {
        return false;
    }

    if SELECTION.low_power_attached() {
        return false;
    }
    let Some(slot) = BRIDGE.try_uninit() else {
        return false;
    };
    let bridge = slot.write(HpBridge::new(*table, timing, &REGION));
    SELECTION.start_high_performance(bridge)
}

/// Service the bus once; call every few milliseconds from one task
///
/// Does nothing before a successful `hcp_hp_init`.
#[no_mangle]
pub extern "C" fn hcp_hp_poll() {
    let bridge = SELECTION.bridge.load(Ordering::Acquire);
    // SAFETY: the pointer comes from the StaticCell and is only ever
    // dereferenced here, from the single polling task
    if let Some(bridge) = unsafe { bridge.as_mut() } {
        bridge.poll();
    }
}

/// Queue an action code for the next poll; 0 clears the queue
#[no_mangle]
pub extern "C" fn hcp_enqueue(code: u16) {
    facade().enqueue(code);
}

#[no_mangle]
pub extern "C" fn hcp_current_status() -> HcpStatus {
    facade().snapshot().into()
}

#[no_mangle]
pub extern "C" fn hcp_is_connected() -> bool {
    facade().is_connected()
}

/// Action the drive asked for since the last call, 0 if none
#[no_mangle]
pub extern "C" fn hcp_take_drive_request() -> u16 {
    facade().take_drive_request().unwrap_or(0)
}

/// Route the host calls to the coprocessor's shared region
///
/// Returns false for a null address or once `hcp_hp_init` has started
/// the application-core agent.
///
/// # Safety
/// `region` must be the address of the coprocessor's shared region,
/// mapped and suitably aligned for the program's lifetime.
#[no_mangle]
pub unsafe extern "C" fn hcp_lp_attach(region: *mut c_void) -> bool {
    SELECTION.attach_low_power(region.cast())
}
