//! # srcdbg-capi
//!
//! C interface for writing simple-format debug info files.
//!
//! Assemblers and compilers written in C link against this library (static
//! or shared) to emit debug info for the programs they build:
//!
//! ```c
//! void *handle;
//! unsigned int file;
//! srcdbg_simp_open_new("game.dbi", &handle);
//! srcdbg_simp_add_source_file_path(handle, "game.asm", &file);
//! srcdbg_simp_add_line_mapping(handle, 0x4000, 0x4002, file, 12);
//! srcdbg_simp_close(handle);
//! ```
//!
//! Every function returns one of the `SRCDBG_E_*` status codes. A handle
//! comes from [`srcdbg_simp_open_new`] and is released by
//! [`srcdbg_simp_close`], whether or not closing succeeds.
//!
//! ## Raw pointers
//!
//! C callers hand us raw pointers: the opaque handle, null-terminated
//! strings and out-parameters. Each exported function checks them for null
//! and converts them to safe types before calling into `srcdbg-core`.

#![allow(unsafe_code)]

use std::ffi::CStr;
use std::ptr;

use libc::{c_char, c_int, c_short, c_uchar, c_uint, c_ushort, c_void};
use srcdbg_core::types::{Mc6809Register, SymbolFlags};
use srcdbg_core::{SimpleWriter, SrcdbgError, SrcdbgResult, WriterStatus};
use tracing::{debug, warn};

pub const SRCDBG_E_SUCCESS: c_int = WriterStatus::Success.code();
pub const SRCDBG_E_OUTOFMEMORY: c_int = WriterStatus::OutOfMemory.code();
pub const SRCDBG_E_IMPORT_FAILED: c_int = WriterStatus::ImportFailed.code();
pub const SRCDBG_E_FOPEN_ERROR: c_int = WriterStatus::FileOpen.code();
pub const SRCDBG_E_FWRITE_ERROR: c_int = WriterStatus::FileWrite.code();
pub const SRCDBG_E_FCLOSE_ERROR: c_int = WriterStatus::FileClose.code();
pub const SRCDBG_E_INVALID_SRC_IDX: c_int = WriterStatus::InvalidSourceIndex.code();
pub const SRCDBG_E_INDEX_OVERFLOW: c_int = WriterStatus::IndexOverflow.code();
pub const SRCDBG_E_INVALID_ARGUMENT: c_int = WriterStatus::InvalidArgument.code();

/// Register ids for the `reg` parameter of [`srcdbg_simp_add_local_relative_symbol`]
/// on 6809 targets
pub const SRCDBG_REGISTER_6809_PC: c_uchar = Mc6809Register::Pc.id();
pub const SRCDBG_REGISTER_6809_SP: c_uchar = Mc6809Register::S.id();
pub const SRCDBG_REGISTER_6809_CC: c_uchar = Mc6809Register::Cc.id();
pub const SRCDBG_REGISTER_6809_A: c_uchar = Mc6809Register::A.id();
pub const SRCDBG_REGISTER_6809_B: c_uchar = Mc6809Register::B.id();
pub const SRCDBG_REGISTER_6809_D: c_uchar = Mc6809Register::D.id();
pub const SRCDBG_REGISTER_6809_U: c_uchar = Mc6809Register::U.id();
pub const SRCDBG_REGISTER_6809_X: c_uchar = Mc6809Register::X.id();
pub const SRCDBG_REGISTER_6809_Y: c_uchar = Mc6809Register::Y.id();
pub const SRCDBG_REGISTER_6809_DP: c_uchar = Mc6809Register::Dp.id();

fn status(result: SrcdbgResult<()>) -> c_int
{
    match result {
        Ok(()) => SRCDBG_E_SUCCESS,
        Err(err) => {
            warn!(error = %err, "srcdbg C call failed");
            err.status().code()
        }
    }
}

/// Borrow a C string as UTF-8.
///
/// ## Safety
///
/// `s` must be null or point to a null-terminated string.
unsafe fn c_str<'a>(s: *const c_char, what: &str) -> SrcdbgResult<&'a str>
{
    if s.is_null() {
        return Err(SrcdbgError::InvalidArgument(format!("{what} is null")));
    }
    let s = unsafe { CStr::from_ptr(s) };
    s.to_str()
        .map_err(|_| SrcdbgError::InvalidArgument(format!("{what} is not valid UTF-8")))
}

/// Borrow the writer behind a handle.
///
/// ## Safety
///
/// `handle` must be null or a live handle from [`srcdbg_simp_open_new`].
unsafe fn writer<'a>(handle: *mut c_void) -> SrcdbgResult<&'a mut SimpleWriter>
{
    unsafe { handle.cast::<SimpleWriter>().as_mut() }
        .ok_or_else(|| SrcdbgError::InvalidArgument("handle is null".to_string()))
}

/// Copy `message` into a caller buffer of `len` bytes, truncating and
/// always null-terminating.
///
/// ## Safety
///
/// `buf` must be null or valid for writes of `len` bytes.
unsafe fn write_details(buf: *mut c_char, len: c_uint, message: &str)
{
    if buf.is_null() || len == 0 {
        return;
    }
    let capacity = len as usize - 1;
    let count = message.len().min(capacity);
    unsafe {
        ptr::copy_nonoverlapping(message.as_ptr().cast::<c_char>(), buf, count);
        *buf.add(count) = 0;
    }
}

/// Create a new debug info file and return a handle for writing to it.
///
/// ## Safety
///
/// `file_path` must be a null-terminated string and `handle_out` must be
/// valid for a pointer write.
#[no_mangle]
pub unsafe extern "C" fn srcdbg_simp_open_new(file_path: *const c_char, handle_out: *mut *mut c_void) -> c_int
{
    if handle_out.is_null() {
        return SRCDBG_E_INVALID_ARGUMENT;
    }
    let result = unsafe { c_str(file_path, "file path") }.and_then(SimpleWriter::create);
    match result {
        Ok(writer) => {
            debug!(path = ?writer.path(), "Opened debug info writer");
            unsafe { *handle_out = Box::into_raw(Box::new(writer)).cast::<c_void>() };
            SRCDBG_E_SUCCESS
        }
        Err(err) => {
            unsafe { *handle_out = ptr::null_mut() };
            status(Err(err))
        }
    }
}

/// Add a source file path, storing its 0-based index in `index_out`.
///
/// Adding the same path again (case-sensitive) yields the same index.
///
/// ## Safety
///
/// `handle` must come from [`srcdbg_simp_open_new`], `source_file_path`
/// must be a null-terminated string, and `index_out` must be valid for a
/// write.
#[no_mangle]
pub unsafe extern "C" fn srcdbg_simp_add_source_file_path(
    handle: *mut c_void,
    source_file_path: *const c_char,
    index_out: *mut c_uint,
) -> c_int
{
    if index_out.is_null() {
        return SRCDBG_E_INVALID_ARGUMENT;
    }
    status(unsafe { writer(handle) }.and_then(|writer| {
        let path = unsafe { c_str(source_file_path, "source file path") }?;
        let index = writer.add_source_file_path(path)?;
        unsafe { *index_out = index };
        Ok(())
    }))
}

/// Map an inclusive address range to a line of a previously added source file.
///
/// ## Safety
///
/// `handle` must come from [`srcdbg_simp_open_new`].
#[no_mangle]
pub unsafe extern "C" fn srcdbg_simp_add_line_mapping(
    handle: *mut c_void,
    address_first: c_ushort,
    address_last: c_ushort,
    source_file_index: c_uint,
    line_number: c_uint,
) -> c_int
{
    status(
        unsafe { writer(handle) }
            .and_then(|writer| writer.add_line_mapping(address_first, address_last, source_file_index, line_number)),
    )
}

/// Add a global symbol with one value everywhere.
///
/// ## Safety
///
/// `handle` must come from [`srcdbg_simp_open_new`] and `symbol_name` must
/// be a null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn srcdbg_simp_add_global_fixed_symbol(
    handle: *mut c_void,
    symbol_name: *const c_char,
    symbol_value: c_int,
) -> c_int
{
    status(unsafe { writer(handle) }.and_then(|writer| {
        let name = unsafe { c_str(symbol_name, "symbol name") }?;
        writer.add_global_fixed_symbol(name, symbol_value)
    }))
}

/// Add a global symbol with flags (bit 0: constant, never relocated).
///
/// ## Safety
///
/// Same as [`srcdbg_simp_add_global_fixed_symbol`].
#[no_mangle]
pub unsafe extern "C" fn srcdbg_simp_add_global_fixed_symbol_flags(
    handle: *mut c_void,
    symbol_name: *const c_char,
    symbol_value: c_int,
    flags: c_uint,
) -> c_int
{
    status(unsafe { writer(handle) }.and_then(|writer| {
        let name = unsafe { c_str(symbol_name, "symbol name") }?;
        writer.add_global_fixed_symbol_with_flags(name, symbol_value, SymbolFlags::from_bits(flags))
    }))
}

/// Add a scope in which a local symbol has `symbol_value`.
///
/// May be called repeatedly for one name to add more scopes.
///
/// ## Safety
///
/// Same as [`srcdbg_simp_add_global_fixed_symbol`].
#[no_mangle]
pub unsafe extern "C" fn srcdbg_simp_add_local_fixed_symbol(
    handle: *mut c_void,
    symbol_name: *const c_char,
    address_first: c_ushort,
    address_last: c_ushort,
    symbol_value: c_int,
) -> c_int
{
    status(unsafe { writer(handle) }.and_then(|writer| {
        let name = unsafe { c_str(symbol_name, "symbol name") }?;
        writer.add_local_fixed_symbol(name, address_first, address_last, symbol_value)
    }))
}

/// Add a scope in which a local symbol is `reg + reg_offset`.
///
/// `reg` is one of the `SRCDBG_REGISTER_*` ids for the target CPU.
///
/// ## Safety
///
/// Same as [`srcdbg_simp_add_global_fixed_symbol`].
#[no_mangle]
pub unsafe extern "C" fn srcdbg_simp_add_local_relative_symbol(
    handle: *mut c_void,
    symbol_name: *const c_char,
    address_first: c_ushort,
    address_last: c_ushort,
    reg: c_uchar,
    reg_offset: c_int,
) -> c_int
{
    status(unsafe { writer(handle) }.and_then(|writer| {
        let name = unsafe { c_str(symbol_name, "symbol name") }?;
        writer.add_local_relative_symbol(name, address_first, address_last, reg, reg_offset)
    }))
}

/// Merge an existing debug info file, shifting its addresses by `offset`.
///
/// On failure nothing is merged, and a description of the problem is
/// copied into `error_details` (up to `num_bytes_error_details` bytes,
/// null-terminated) when that buffer is not null.
///
/// ## Safety
///
/// `handle` must come from [`srcdbg_simp_open_new`], `file_path_to_import`
/// must be a null-terminated string, and `error_details` must be null or
/// valid for writes of `num_bytes_error_details` bytes.
#[no_mangle]
pub unsafe extern "C" fn srcdbg_simp_import(
    handle: *mut c_void,
    file_path_to_import: *const c_char,
    offset: c_short,
    error_details: *mut c_char,
    num_bytes_error_details: c_uint,
) -> c_int
{
    let result = unsafe { writer(handle) }.and_then(|writer| {
        let path = unsafe { c_str(file_path_to_import, "import path") }?;
        writer.import(path, i32::from(offset))
    });
    if let Err(err) = &result {
        unsafe { write_details(error_details, num_bytes_error_details, &err.to_string()) };
    }
    status(result)
}

/// Write the file, close it and release the handle.
///
/// The handle is released even when writing fails; the partial file is
/// removed in that case.
///
/// ## Safety
///
/// `handle` must come from [`srcdbg_simp_open_new`] and must not be used
/// afterwards.
#[no_mangle]
pub unsafe extern "C" fn srcdbg_simp_close(handle: *mut c_void) -> c_int
{
    if handle.is_null() {
        return SRCDBG_E_INVALID_ARGUMENT;
    }
    let writer = unsafe { Box::from_raw(handle.cast::<SimpleWriter>()) };
    status(writer.close())
}
