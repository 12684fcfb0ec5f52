//! Driving the writer through the exported C functions

#![allow(unsafe_code)]

use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr;

use libc::{c_char, c_uint, c_void};
use srcdbg_capi::*;
use srcdbg_core::provider::{SimpleProvider, SourceDebugProvider};
use srcdbg_core::types::{Address, FileLine};
use srcdbg_core::LoadOptions;

fn c_path(path: &Path) -> CString
{
    CString::new(path.to_str().unwrap()).unwrap()
}

fn open(path: &Path) -> *mut c_void
{
    let mut handle = ptr::null_mut();
    let status = unsafe { srcdbg_simp_open_new(c_path(path).as_ptr(), &mut handle) };
    assert_eq!(status, SRCDBG_E_SUCCESS);
    assert!(!handle.is_null());
    handle
}

#[test]
fn test_write_file_through_c_interface()
{
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("game.dbi");
    let handle = open(&out);

    let source = CString::new("game.asm").unwrap();
    let counter = CString::new("counter").unwrap();
    let frame = CString::new("frame").unwrap();
    let mut index: c_uint = 99;
    unsafe {
        assert_eq!(
            srcdbg_simp_add_source_file_path(handle, source.as_ptr(), &mut index),
            SRCDBG_E_SUCCESS
        );
        assert_eq!(index, 0);
        assert_eq!(srcdbg_simp_add_line_mapping(handle, 0x4000, 0x4002, index, 12), SRCDBG_E_SUCCESS);
        assert_eq!(
            srcdbg_simp_add_line_mapping(handle, 0x4003, 0x4004, 1, 13),
            SRCDBG_E_INVALID_SRC_IDX
        );
        assert_eq!(
            srcdbg_simp_add_global_fixed_symbol(handle, counter.as_ptr(), 0x0200),
            SRCDBG_E_SUCCESS
        );
        assert_eq!(
            srcdbg_simp_add_local_relative_symbol(handle, frame.as_ptr(), 0x4000, 0x4002, SRCDBG_REGISTER_6809_U, -2),
            SRCDBG_E_SUCCESS
        );
        assert_eq!(srcdbg_simp_close(handle), SRCDBG_E_SUCCESS);
    }

    let provider = SimpleProvider::load(&out, &LoadOptions::default()).unwrap();
    assert_eq!(
        provider.address_to_file_line(Address::new(0x4001)),
        Some(FileLine::new(0, 12))
    );
    assert_eq!(provider.global_fixed_symbols()[0].value(), 0x0200);
}

#[test]
fn test_import_reports_details()
{
    let dir = tempfile::tempdir().unwrap();
    let handle = open(&dir.path().join("out.dbi"));
    let missing = c_path(&dir.path().join("missing.dbi"));
    let mut details = [0 as c_char; 128];

    unsafe {
        let status = srcdbg_simp_import(
            handle,
            missing.as_ptr(),
            0,
            details.as_mut_ptr(),
            c_uint::try_from(details.len()).unwrap(),
        );
        assert_eq!(status, SRCDBG_E_IMPORT_FAILED);
        let message = CStr::from_ptr(details.as_ptr()).to_str().unwrap();
        assert!(message.starts_with("Failed to import"), "{message}");

        assert_eq!(srcdbg_simp_close(handle), SRCDBG_E_SUCCESS);
    }
}

#[test]
fn test_import_with_offset()
{
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.dbi");
    let merged = dir.path().join("merged.dbi");
    let source = CString::new("a.asm").unwrap();
    let mut index: c_uint = 0;

    unsafe {
        let handle = open(&first);
        srcdbg_simp_add_source_file_path(handle, source.as_ptr(), &mut index);
        srcdbg_simp_add_line_mapping(handle, 0x0010, 0x0011, index, 1);
        assert_eq!(srcdbg_simp_close(handle), SRCDBG_E_SUCCESS);

        let handle = open(&merged);
        let status = srcdbg_simp_import(handle, c_path(&first).as_ptr(), -0x10, ptr::null_mut(), 0);
        assert_eq!(status, SRCDBG_E_SUCCESS);
        assert_eq!(srcdbg_simp_close(handle), SRCDBG_E_SUCCESS);
    }

    let provider = SimpleProvider::load(&merged, &LoadOptions::default()).unwrap();
    assert_eq!(provider.address_to_file_line(Address::ZERO), Some(FileLine::new(0, 1)));
}

#[test]
fn test_bad_arguments()
{
    let dir = tempfile::tempdir().unwrap();
    let mut handle = ptr::null_mut();
    let path = c_path(&dir.path().join("no/such/dir/out.dbi"));
    let name = CString::new("x").unwrap();
    let mut index: c_uint = 0;

    unsafe {
        assert_eq!(srcdbg_simp_open_new(path.as_ptr(), &mut handle), SRCDBG_E_FOPEN_ERROR);
        assert!(handle.is_null());
        assert_eq!(srcdbg_simp_open_new(ptr::null(), &mut handle), SRCDBG_E_INVALID_ARGUMENT);
        assert_eq!(
            srcdbg_simp_add_source_file_path(ptr::null_mut(), name.as_ptr(), &mut index),
            SRCDBG_E_INVALID_ARGUMENT
        );
        assert_eq!(
            srcdbg_simp_add_global_fixed_symbol(ptr::null_mut(), name.as_ptr(), 1),
            SRCDBG_E_INVALID_ARGUMENT
        );
        assert_eq!(srcdbg_simp_close(ptr::null_mut()), SRCDBG_E_INVALID_ARGUMENT);
    }
}
