//! C ABI for rack decoding.
//!
//! The host owns image acquisition and the datamatrix decoder itself: it
//! passes an 8-bit grayscale buffer and a decode callback, and reads the
//! per-well results back through the query functions. All functions are
//! null-safe and report failures through `DMSCAN_*` status codes.
//!
//! The callback is invoked concurrently from worker threads on different
//! sub-images, so it must be thread-safe.

use dmscan::{
    ColumnOrder, DecodeOptions, DecodedSymbol, Dib, DmScanConfig, DmScanLib, PlateGrid, Point,
    PrimitiveError, Rect, ScanError, SymbolDecoder,
};
use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr;
use std::sync::Arc;

pub const DMSCAN_SUCCESS: c_int = 0;
pub const DMSCAN_FAIL: c_int = -1;
pub const DMSCAN_INVALID_ARGUMENT: c_int = -2;
pub const DMSCAN_INVALID_IMAGE: c_int = -3;
pub const DMSCAN_INVALID_OPTIONS: c_int = -4;
pub const DMSCAN_NO_VALID_WELLS: c_int = -5;
pub const DMSCAN_NO_RESULT: c_int = -6;

/// Size of the message buffer handed to the decode callback.
pub const DMSCAN_MAX_MESSAGE: usize = 512;

/// Callback return: a symbol was decoded.
pub const DMSCAN_DECODE_FOUND: c_int = 1;
/// Callback return: the region holds no readable symbol.
pub const DMSCAN_DECODE_NOT_FOUND: c_int = 0;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DmScanDecodeOptions {
    pub scan_gap: f64,
    pub square_dev: i64,
    pub edge_thresh: i64,
    pub corrections: i64,
    pub shrink: i64,
}

impl From<DecodeOptions> for DmScanDecodeOptions {
    fn from(o: DecodeOptions) -> Self {
        Self {
            scan_gap: o.scan_gap,
            square_dev: o.square_dev,
            edge_thresh: o.edge_thresh,
            corrections: o.corrections,
            shrink: o.shrink,
        }
    }
}

impl From<DmScanDecodeOptions> for DecodeOptions {
    fn from(o: DmScanDecodeOptions) -> Self {
        DecodeOptions::new(o.scan_gap, o.square_dev, o.edge_thresh, o.corrections, o.shrink)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DmScanPoint {
    pub x: u32,
    pub y: u32,
}

/// Symbol corners in the coordinates of the buffer the callback received.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DmScanRect {
    pub corners: [DmScanPoint; 4],
}

/// Host decode callback.
///
/// Reads the `width * height` grayscale `pixels`, writes a NUL-terminated
/// message of at most `message_cap` bytes and the symbol corners, and
/// returns `DMSCAN_DECODE_FOUND`, `DMSCAN_DECODE_NOT_FOUND`, or a negative
/// value on decoder failure.
pub type DmScanDecodeFn = extern "C" fn(
    user: *mut c_void,
    pixels: *const u8,
    width: u32,
    height: u32,
    options: *const DmScanDecodeOptions,
    message: *mut c_char,
    message_cap: usize,
    rect: *mut DmScanRect,
) -> c_int;

struct HostDecoder {
    decode: DmScanDecodeFn,
    user: *mut c_void,
}

// The host guarantees the callback and its user data are thread-safe.
unsafe impl Send for HostDecoder {}
unsafe impl Sync for HostDecoder {}

impl SymbolDecoder for HostDecoder {
    fn decode(
        &self,
        image: &Dib,
        options: &DecodeOptions,
    ) -> Result<Option<DecodedSymbol>, PrimitiveError> {
        let c_options = DmScanDecodeOptions::from(*options);
        let mut message = [0 as c_char; DMSCAN_MAX_MESSAGE];
        let mut rect = DmScanRect::default();
        let rc = (self.decode)(
            self.user,
            image.data().as_ptr(),
            image.width(),
            image.height(),
            &c_options,
            message.as_mut_ptr(),
            message.len(),
            &mut rect,
        );
        match rc {
            DMSCAN_DECODE_NOT_FOUND => Ok(None),
            DMSCAN_DECODE_FOUND => {
                // Force termination in case the host filled the whole buffer.
                message[DMSCAN_MAX_MESSAGE - 1] = 0;
                // SAFETY: `message` is NUL-terminated and lives for this call.
                let text = unsafe { CStr::from_ptr(message.as_ptr()) };
                Ok(Some(DecodedSymbol {
                    message: text.to_string_lossy().into_owned(),
                    rect: Rect::new(rect.corners.map(|c| Point::new(c.x, c.y))),
                }))
            }
            code => Err(PrimitiveError::new(format!("host decoder returned {code}"))),
        }
    }
}

struct Entry {
    label: String,
    message: Option<String>,
    rect: Option<DmScanRect>,
}

/// Opaque decoder handle.
pub struct DmScan {
    scanner: DmScanLib,
    options: DecodeOptions,
    results: Vec<Entry>,
    last_error: String,
}

impl DmScan {
    fn fail(&mut self, err: &ScanError) -> c_int {
        self.results.clear();
        self.last_error = err.to_string();
        log::error!("{}", self.last_error);
        match err {
            ScanError::Image(_) => DMSCAN_INVALID_IMAGE,
            ScanError::Decode(dmscan::decoder::DecodeError::InvalidOptions(_)) => {
                DMSCAN_INVALID_OPTIONS
            }
            ScanError::NoValidWells | ScanError::Grid(_) | ScanError::DuplicateLabel(_) => {
                DMSCAN_NO_VALID_WELLS
            }
            _ => DMSCAN_FAIL,
        }
    }
}

fn from_rect(rect: &Rect<u32>) -> DmScanRect {
    DmScanRect {
        corners: rect.corners.map(|c| DmScanPoint { x: c.x, y: c.y }),
    }
}

/// Copy `pixels` into an owned image.
///
/// # Safety
/// `pixels` must point to `width * height` readable bytes.
unsafe fn image_from_raw(
    pixels: *const u8,
    width: u32,
    height: u32,
    dpi: u32,
) -> Result<Dib, ScanError> {
    let len = (width as usize).saturating_mul(height as usize);
    if pixels.is_null() || len == 0 {
        return Err(ScanError::Image(dmscan::core::ImageError::InvalidDimensions {
            width,
            height,
        }));
    }
    let data = std::slice::from_raw_parts(pixels, len);
    Ok(Dib::from_slice(width, height, dpi, data)?)
}

/// Copy `s` into `buf` as a NUL-terminated string, truncating to `cap - 1`
/// bytes. Returns the full length of `s`.
///
/// # Safety
/// `buf` must be null or point to `cap` writable bytes.
unsafe fn write_str(s: &str, buf: *mut c_char, cap: usize) -> c_int {
    if !buf.is_null() && cap > 0 {
        let n = s.len().min(cap - 1);
        ptr::copy_nonoverlapping(s.as_ptr().cast::<c_char>(), buf, n);
        *buf.add(n) = 0;
    }
    c_int::try_from(s.len()).unwrap_or(c_int::MAX)
}

/// Create a decoder handle. `workers == 0` uses one worker per CPU.
///
/// Returns null if `decode` is null or the worker pool cannot be built.
///
/// # Safety
/// `user` is passed to `decode` unchanged from worker threads; it must stay
/// valid until [`dmscan_free`] is called.
#[no_mangle]
pub unsafe extern "C" fn dmscan_create(
    workers: u32,
    decode: Option<DmScanDecodeFn>,
    user: *mut c_void,
) -> *mut DmScan {
    let Some(decode) = decode else {
        return ptr::null_mut();
    };
    let mut config = DmScanConfig::default();
    if workers > 0 {
        config = config.with_workers(workers as usize);
    }
    match DmScanLib::with_config(config, Arc::new(HostDecoder { decode, user })) {
        Ok(scanner) => Box::into_raw(Box::new(DmScan {
            scanner,
            options: DecodeOptions::default(),
            results: Vec::new(),
            last_error: String::new(),
        })),
        Err(err) => {
            log::error!("{err}");
            ptr::null_mut()
        }
    }
}

/// Release a handle created by [`dmscan_create`].
///
/// # Safety
/// `handle` must be null or a live handle; it is invalid afterwards.
#[no_mangle]
pub unsafe extern "C" fn dmscan_free(handle: *mut DmScan) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Fill `out` with the default decode options.
///
/// # Safety
/// `out` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn dmscan_default_options(out: *mut DmScanDecodeOptions) -> c_int {
    if out.is_null() {
        return DMSCAN_INVALID_ARGUMENT;
    }
    *out = DecodeOptions::default().into();
    DMSCAN_SUCCESS
}

/// Set the options used by subsequent decode calls.
///
/// # Safety
/// `handle` and `options` must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn dmscan_set_options(
    handle: *mut DmScan,
    options: *const DmScanDecodeOptions,
) -> c_int {
    let (Some(scan), Some(options)) = (handle.as_mut(), options.as_ref()) else {
        return DMSCAN_INVALID_ARGUMENT;
    };
    let options = DecodeOptions::from(*options);
    if let Err(err) = options.validate() {
        scan.last_error = err.to_string();
        return DMSCAN_INVALID_OPTIONS;
    }
    scan.options = options;
    DMSCAN_SUCCESS
}

/// Decode a `rows x cols` rack covering the whole image.
///
/// Rows are lettered from `A` at the top; columns are numbered from 1 on
/// the left, or on the right when `descending` is non-zero. Results are kept
/// in row-major order until the next decode call.
///
/// # Safety
/// `handle` must be null or valid; `pixels` must point to `width * height`
/// bytes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn dmscan_decode_plate(
    handle: *mut DmScan,
    pixels: *const u8,
    width: u32,
    height: u32,
    dpi: u32,
    rows: u32,
    cols: u32,
    descending: c_int,
) -> c_int {
    let Some(scan) = handle.as_mut() else {
        return DMSCAN_INVALID_ARGUMENT;
    };
    let result = image_from_raw(pixels, width, height, dpi).and_then(|image| {
        let (w, h) = image.size_inches();
        let order = if descending != 0 {
            ColumnOrder::Descending
        } else {
            ColumnOrder::Ascending
        };
        let grid = PlateGrid {
            rows,
            cols,
            width: w,
            height: h,
            column_order: order,
        };
        let wells = grid.well_rects()?;
        scan.scanner.decode_wells(image, scan.options, &wells)
    });
    match result {
        Ok(plate) => {
            scan.results = plate
                .wells
                .iter()
                .map(|w| Entry {
                    label: w.label.clone(),
                    message: w.message().map(str::to_string),
                    rect: match &w.outcome {
                        dmscan::WellOutcome::Decoded { rect, .. } => Some(from_rect(rect)),
                        dmscan::WellOutcome::NotDecoded { .. } => None,
                    },
                })
                .collect();
            scan.last_error.clear();
            DMSCAN_SUCCESS
        }
        Err(err) => scan.fail(&err),
    }
}

/// Decode every symbol in the image without a well layout.
///
/// Results are labelled by position (`"1"`, `"2"`, ...) in reading order.
///
/// # Safety
/// As for [`dmscan_decode_plate`].
#[no_mangle]
pub unsafe extern "C" fn dmscan_decode_image(
    handle: *mut DmScan,
    pixels: *const u8,
    width: u32,
    height: u32,
    dpi: u32,
) -> c_int {
    let Some(scan) = handle.as_mut() else {
        return DMSCAN_INVALID_ARGUMENT;
    };
    let result = image_from_raw(pixels, width, height, dpi)
        .and_then(|image| scan.scanner.decode_image(image, scan.options));
    match result {
        Ok(found) => {
            scan.results = found
                .symbols
                .iter()
                .enumerate()
                .map(|(i, s)| Entry {
                    label: (i + 1).to_string(),
                    message: Some(s.message.clone()),
                    rect: Some(from_rect(&s.rect)),
                })
                .collect();
            scan.last_error.clear();
            DMSCAN_SUCCESS
        }
        Err(err) => scan.fail(&err),
    }
}

/// Number of entries from the last decode call, or a negative status.
///
/// # Safety
/// `handle` must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn dmscan_result_count(handle: *const DmScan) -> c_int {
    match handle.as_ref() {
        Some(scan) => c_int::try_from(scan.results.len()).unwrap_or(c_int::MAX),
        None => DMSCAN_INVALID_ARGUMENT,
    }
}

/// Number of entries with a decoded message, or a negative status.
///
/// # Safety
/// `handle` must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn dmscan_decoded_well_count(handle: *const DmScan) -> c_int {
    match handle.as_ref() {
        Some(scan) => {
            let n = scan.results.iter().filter(|e| e.message.is_some()).count();
            c_int::try_from(n).unwrap_or(c_int::MAX)
        }
        None => DMSCAN_INVALID_ARGUMENT,
    }
}

/// Copy the label of entry `index` into `buf`.
///
/// Returns the label length (which may exceed `cap - 1`) or a negative
/// status.
///
/// # Safety
/// `handle` must be null or valid; `buf` must be null or hold `cap` bytes.
#[no_mangle]
pub unsafe extern "C" fn dmscan_result_label(
    handle: *const DmScan,
    index: u32,
    buf: *mut c_char,
    cap: usize,
) -> c_int {
    let Some(scan) = handle.as_ref() else {
        return DMSCAN_INVALID_ARGUMENT;
    };
    match scan.results.get(index as usize) {
        Some(entry) => write_str(&entry.label, buf, cap),
        None => DMSCAN_INVALID_ARGUMENT,
    }
}

/// Copy the decoded message of entry `index` into `buf`.
///
/// Returns the message length, `DMSCAN_NO_RESULT` if the entry was not
/// decoded, or another negative status.
///
/// # Safety
/// As for [`dmscan_result_label`].
#[no_mangle]
pub unsafe extern "C" fn dmscan_result_message(
    handle: *const DmScan,
    index: u32,
    buf: *mut c_char,
    cap: usize,
) -> c_int {
    let Some(scan) = handle.as_ref() else {
        return DMSCAN_INVALID_ARGUMENT;
    };
    match scan.results.get(index as usize) {
        Some(Entry {
            message: Some(message),
            ..
        }) => write_str(message, buf, cap),
        Some(_) => DMSCAN_NO_RESULT,
        None => DMSCAN_INVALID_ARGUMENT,
    }
}

/// Copy the decoded symbol corners of entry `index` into `out`.
///
/// # Safety
/// `handle` must be null or valid; `out` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn dmscan_result_rect(
    handle: *const DmScan,
    index: u32,
    out: *mut DmScanRect,
) -> c_int {
    let (Some(scan), false) = (handle.as_ref(), out.is_null()) else {
        return DMSCAN_INVALID_ARGUMENT;
    };
    match scan.results.get(index as usize) {
        Some(Entry { rect: Some(rect), .. }) => {
            *out = *rect;
            DMSCAN_SUCCESS
        }
        Some(_) => DMSCAN_NO_RESULT,
        None => DMSCAN_INVALID_ARGUMENT,
    }
}

/// Copy the decoded message of the well labelled `label` into `buf`.
///
/// # Safety
/// `handle` must be null or valid; `label` must be null or a NUL-terminated
/// string; `buf` must be null or hold `cap` bytes.
#[no_mangle]
pub unsafe extern "C" fn dmscan_well_message(
    handle: *const DmScan,
    label: *const c_char,
    buf: *mut c_char,
    cap: usize,
) -> c_int {
    let (Some(scan), false) = (handle.as_ref(), label.is_null()) else {
        return DMSCAN_INVALID_ARGUMENT;
    };
    let Ok(label) = CStr::from_ptr(label).to_str() else {
        return DMSCAN_INVALID_ARGUMENT;
    };
    match scan.results.iter().find(|e| e.label == label) {
        Some(Entry {
            message: Some(message),
            ..
        }) => write_str(message, buf, cap),
        Some(_) => DMSCAN_NO_RESULT,
        None => DMSCAN_INVALID_ARGUMENT,
    }
}

/// Copy the message of the last failure into `buf`; empty after success.
///
/// # Safety
/// As for [`dmscan_result_label`].
#[no_mangle]
pub unsafe extern "C" fn dmscan_last_error(
    handle: *const DmScan,
    buf: *mut c_char,
    cap: usize,
) -> c_int {
    match handle.as_ref() {
        Some(scan) => write_str(&scan.last_error, buf, cap),
        None => DMSCAN_INVALID_ARGUMENT,
    }
}
