//! Low-level FFI bindings for the Tektronix RSA API.
//!
//! `libRSA_API` is the vendor C driver for the USB real-time spectrum
//! analyzers of the RSA306/306B, RSA500A and RSA600A series. It is a
//! process-global, single-device library: functions take no handle, write
//! results through output pointers and report success or failure through a
//! `ReturnStatus` integer.
//!
//! # Safety
//!
//! All functions in this crate are `unsafe` as they are direct FFI bindings.
//! For a safe wrapper, use the `daq-driver-tekrsa` crate instead.
//!
//! # Features
//!
//! - `rsa-sdk`: Generate bindings from `RSA_API.h` (found through the
//!   `RSA_API_DIR` environment variable, default `/opt/tekrsa`) and link the
//!   vendor library. Without this feature, dummy bindings with the same names
//!   and layouts are used and every function panics when called.
//!
//! # Example (unsafe)
//!
//! ```no_run
//! use rsa_api_sys::*;
//! use std::os::raw::{c_char, c_int};
//!
//! unsafe {
//!     let mut found: c_int = 0;
//!     let mut ids = [0 as c_int; DEVSRCH_MAX_NUM_DEVICES as usize];
//!     let mut serials = [[0 as c_char; DEVSRCH_SERIAL_MAX_STRLEN as usize];
//!         DEVSRCH_MAX_NUM_DEVICES as usize];
//!     let mut types = [[0 as c_char; DEVSRCH_TYPE_MAX_STRLEN as usize];
//!         DEVSRCH_MAX_NUM_DEVICES as usize];
//!     let status = DEVICE_Search(
//!         &mut found,
//!         ids.as_mut_ptr(),
//!         serials.as_mut_ptr(),
//!         types.as_mut_ptr(),
//!     );
//!     if status == noError && found > 0 && DEVICE_Connect(ids[0]) == noError {
//!         println!("connected to device {}", ids[0]);
//!         DEVICE_Disconnect();
//!     }
//! }
//! ```

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(dead_code)]
#![allow(clippy::all)]

include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_status_codes() {
        assert_eq!(noError, 0);
        assert_eq!(errorNotConnected, 101);
        assert_eq!(errorDisconnectedDeviceRemoved, 3101);
        assert_eq!(errorTimeout, 3001);
        assert_eq!(notImplemented, -1);
    }

    #[test]
    fn test_search_buffer_sizes() {
        assert_eq!(DEVSRCH_MAX_NUM_DEVICES, 20);
        assert_eq!(DEVSRCH_SERIAL_MAX_STRLEN, 100);
        assert_eq!(DEVSRCH_TYPE_MAX_STRLEN, 20);
        assert_eq!(DEVINFO_MAX_STRLEN, 100);
    }

    #[test]
    fn test_enum_encodings() {
        assert_eq!(SpectrumWindow_Kaiser, 0);
        assert_eq!(SpectrumWindow_Hann, 5);
        assert_eq!(SpectrumDetector_Sample, 3);
        assert_eq!(TriggerTransitionLH, 1);
        assert_eq!(TriggerTransitionEither, 3);
        assert_eq!(FRI_GNSS, 2);
    }

    #[test]
    fn test_acq_status_mask() {
        let bits = AcqDataStatus_ADC_OVERRANGE
            | AcqDataStatus_REF_OSC_UNLOCK
            | AcqDataStatus_LOW_SUPPLY_VOLTAGE
            | AcqDataStatus_ADC_DATA_LOST;
        assert_eq!(bits, AcqDataStatus_VALID_BITS_MASK);
    }

    #[test]
    fn test_iq_stream_status_bits() {
        let sticky_overflow = IQSTRM_STATUS_IBUFFOVFLOW << IQSTRM_STATUS_STICKY_SHIFT;
        assert_eq!(sticky_overflow, 0x8_0000);
        assert_eq!(IQSTRM_STATUS_OBUFFOVFLOW << IQSTRM_STATUS_STICKY_SHIFT, 0x20_0000);
        assert_eq!(IQSOD_FILE_SIQ_SPLIT, 3);
        assert_eq!(IQSSDFN_SUFFIX_NONE, -2);
        assert_eq!(RTSRC_GNSS, 2);
    }

    #[test]
    fn test_structs_zero_initialise() {
        let info = DEVICE_INFO::default();
        assert_eq!(info.serialNum[0], 0);
        let frame = DPX_FrameBuffer::default();
        assert!(frame.sogramBitmap.is_null());
        let stream = IQSTREAM_File_Info::default();
        assert!(stream.filenames.is_null());
    }
}
