//! Device identity tracking
//!
//! Submit events only carry a target id, so the device a region runs on is
//! remembered from the region's `ompt_callback_target` begin event until its
//! end event. Also holds the runtime's initial (host) device number and the
//! optional translation from runtime device numbers to OpenACC device types.

use std::collections::BTreeMap;
use std::fmt;

use crate::acc::AccDeviceType;
use crate::ompt::OmptId;

/// Translation from a runtime device number to an OpenACC device type and a
/// device number counted per type.
///
/// Return `None` when the runtime has no specific type for the device; the
/// device is then reported as `acc_device_not_host` with its runtime number.
pub trait DeviceNumbering: Send {
    fn classify(&self, device_num: i32) -> Option<(AccDeviceType, i32)>;
}

/// Device type and number as reported in event payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceClass {
    pub device_type: AccDeviceType,
    pub device_number: i32,
}

/// Initial device number, active region sessions, and device numbering
pub struct DeviceTracker {
    initial_device_num: i32,
    regions: BTreeMap<OmptId, i32>,
    numbering: Option<Box<dyn DeviceNumbering>>,
}

impl fmt::Debug for DeviceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceTracker")
            .field("initial_device_num", &self.initial_device_num)
            .field("regions", &self.regions)
            .field("numbering", &self.numbering.as_ref().map(|_| "<DeviceNumbering>"))
            .finish()
    }
}

impl Default for DeviceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTracker {
    pub const fn new() -> Self {
        DeviceTracker {
            initial_device_num: 0,
            regions: BTreeMap::new(),
            numbering: None,
        }
    }

    /// Record the initial device number passed to the tool's initialize.
    pub fn set_initial_device(&mut self, device_num: i32) {
        self.initial_device_num = device_num;
    }

    pub fn initial_device(&self) -> i32 {
        self.initial_device_num
    }

    pub fn set_numbering(&mut self, numbering: Option<Box<dyn DeviceNumbering>>) {
        self.numbering = numbering;
    }

    /// Open a region session for `target_id` on `device_num`.
    pub fn begin_region(&mut self, target_id: OmptId, device_num: i32) {
        self.regions.insert(target_id, device_num);
    }

    /// Close the region session for `target_id`.
    pub fn end_region(&mut self, target_id: OmptId) {
        self.regions.remove(&target_id);
    }

    /// Device of the open region `target_id`, if any.
    pub fn region_device(&self, target_id: OmptId) -> Option<i32> {
        self.regions.get(&target_id).copied()
    }

    pub fn open_regions(&self) -> usize {
        self.regions.len()
    }

    /// Drop all region sessions.
    pub fn clear_regions(&mut self) {
        self.regions.clear();
    }

    /// Classify a runtime device number for event payloads.
    pub fn classify(&self, device_num: i32) -> DeviceClass {
        match &self.numbering {
            Some(numbering) => match numbering.classify(device_num) {
                Some((device_type, device_number)) => DeviceClass {
                    device_type,
                    device_number,
                },
                None => DeviceClass {
                    device_type: AccDeviceType::NotHost,
                    device_number: device_num,
                },
            },
            None => DeviceClass {
                device_type: if device_num == self.initial_device_num {
                    AccDeviceType::Host
                } else {
                    AccDeviceType::NotHost
                },
                device_number: device_num,
            },
        }
    }
}
