//! C ABI over the identity matcher, built into the cdylib.
//!
//! Handles are heap pointers owned by the caller until passed to
//! `facematch_release`. No call panics across the boundary.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_float, c_int};
use std::ptr;

use facematch_core::{IdentityMatcher, MatchError, MatcherConfig, Metric};
use log::warn;

// Status codes
pub const FACEMATCH_OK: c_int = 0;
pub const FACEMATCH_CONFIG_ERR: c_int = 1;
pub const FACEMATCH_INVALID_EMBEDDING: c_int = 2;
pub const FACEMATCH_DEGENERATE: c_int = 3;
pub const FACEMATCH_NULL_ARG: c_int = 4;

// Metric selectors
pub const FACEMATCH_METRIC_COSINE: c_int = 0;
pub const FACEMATCH_METRIC_L2: c_int = 1;

/// Opaque handle type seen by C callers.
pub type FaceMatcher = IdentityMatcher;

fn status(err: &MatchError) -> c_int {
    match err {
        MatchError::Configuration(_) => FACEMATCH_CONFIG_ERR,
        MatchError::DimensionMismatch { .. } | MatchError::NonFinite { .. } => {
            FACEMATCH_INVALID_EMBEDDING
        }
        MatchError::DegenerateVector { .. } => FACEMATCH_DEGENERATE,
    }
}

fn metric_from(raw: c_int) -> Option<Metric> {
    match raw {
        FACEMATCH_METRIC_COSINE => Some(Metric::Cosine),
        FACEMATCH_METRIC_L2 => Some(Metric::L2),
        _ => None,
    }
}

/// Names are taken byte-exact; invalid UTF-8 is refused rather than
/// replaced, so distinct C names never merge into one subject.
unsafe fn read_names(names: *const *const c_char, count: usize) -> Result<Vec<String>, c_int> {
    let mut out = Vec::new();
    for i in 0..count {
        let p = *names.add(i);
        if p.is_null() {
            warn!("facematch_create: name {} is null", i);
            return Err(FACEMATCH_NULL_ARG);
        }
        match CStr::from_ptr(p).to_str() {
            Ok(name) => out.push(name.to_owned()),
            Err(e) => {
                warn!("facematch_create: name {} is not valid UTF-8: {}", i, e);
                return Err(FACEMATCH_CONFIG_ERR);
            }
        }
    }
    Ok(out)
}

/// Build a matcher from `count` names and `count * dim` contiguous floats.
///
/// # Safety
/// `names` must point to `count` NUL-terminated strings, `embeddings` to
/// `count * dim` floats, and `out` to writable storage for one pointer.
#[no_mangle]
pub unsafe extern "C" fn facematch_create(
    names: *const *const c_char,
    embeddings: *const c_float,
    count: usize,
    dim: usize,
    threshold: c_float,
    metric: c_int,
    out: *mut *mut FaceMatcher,
) -> c_int {
    if out.is_null() {
        return FACEMATCH_NULL_ARG;
    }
    *out = ptr::null_mut();
    if count > 0 && (names.is_null() || embeddings.is_null()) {
        return FACEMATCH_NULL_ARG;
    }
    let Some(metric) = metric_from(metric) else {
        return FACEMATCH_CONFIG_ERR;
    };
    if dim == 0 {
        return FACEMATCH_CONFIG_ERR;
    }
    let total = match count.checked_mul(dim) {
        Some(t) if t <= isize::MAX as usize / std::mem::size_of::<c_float>() => t,
        _ => {
            warn!("facematch_create: {} x {} floats overflows", count, dim);
            return FACEMATCH_CONFIG_ERR;
        }
    };

    let names = if count == 0 {
        Vec::new()
    } else {
        match read_names(names, count) {
            Ok(n) => n,
            Err(code) => return code,
        }
    };
    let flat: &[f32] = if count == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(embeddings, total)
    };
    let rows: Vec<&[f32]> = flat.chunks_exact(dim).collect();

    let config = MatcherConfig {
        embedding_dim: dim,
        metric,
        threshold,
    };
    match IdentityMatcher::new(&names, &rows, config) {
        Ok(matcher) => {
            *out = Box::into_raw(Box::new(matcher));
            FACEMATCH_OK
        }
        Err(e) => {
            warn!("facematch_create: {}", e);
            status(&e)
        }
    }
}

/// Identify `probe` (`len` floats). On success `*out` holds a new string
/// that must be freed with `facematch_string_free`.
///
/// # Safety
/// `handle` must come from `facematch_create` and not be released,
/// `probe` must point to `len` floats and `out` to writable storage.
#[no_mangle]
pub unsafe extern "C" fn facematch_identify(
    handle: *const FaceMatcher,
    probe: *const c_float,
    len: usize,
    out: *mut *mut c_char,
) -> c_int {
    if out.is_null() {
        return FACEMATCH_NULL_ARG;
    }
    *out = ptr::null_mut();
    if handle.is_null() || (probe.is_null() && len > 0) {
        return FACEMATCH_NULL_ARG;
    }
    if len > isize::MAX as usize / std::mem::size_of::<c_float>() {
        return FACEMATCH_INVALID_EMBEDDING;
    }
    let probe: &[f32] = if len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(probe, len)
    };

    match (*handle).identify(probe) {
        Ok(label) => match CString::new(label.as_str()) {
            Ok(s) => {
                *out = s.into_raw();
                FACEMATCH_OK
            }
            // names read from C strings cannot hold interior NULs
            Err(_) => FACEMATCH_CONFIG_ERR,
        },
        Err(e) => {
            warn!("facematch_identify: {}", e);
            status(&e)
        }
    }
}

/// # Safety
/// `label` must come from `facematch_identify` or be null.
#[no_mangle]
pub unsafe extern "C" fn facematch_string_free(label: *mut c_char) {
    if !label.is_null() {
        drop(CString::from_raw(label));
    }
}

/// Release a matcher. Null is a no-op.
///
/// # Safety
/// `handle` must come from `facematch_create` and not be released twice.
#[no_mangle]
pub unsafe extern "C" fn facematch_release(handle: *mut FaceMatcher) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Standardize `len` floats in place to zero mean and unit variance.
///
/// # Safety
/// `values` must point to `len` writable floats.
#[no_mangle]
pub unsafe extern "C" fn facematch_standardize(values: *mut c_float, len: usize) -> c_int {
    if values.is_null() {
        return FACEMATCH_NULL_ARG;
    }
    if len > isize::MAX as usize / std::mem::size_of::<c_float>() {
        return FACEMATCH_CONFIG_ERR;
    }
    let values = std::slice::from_raw_parts_mut(values, len);
    match facematch_core::embedding::standardize(values) {
        Ok(()) => FACEMATCH_OK,
        Err(e) => status(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Names {
        _owned: Vec<CString>,
        ptrs: Vec<*const c_char>,
    }

    fn names(list: &[&str]) -> Names {
        let owned: Vec<CString> = list.iter().map(|n| CString::new(*n).unwrap()).collect();
        let ptrs = owned.iter().map(|s| s.as_ptr()).collect();
        Names {
            _owned: owned,
            ptrs,
        }
    }

    unsafe fn identify(handle: *const FaceMatcher, probe: &[f32]) -> (c_int, Option<String>) {
        let mut out = ptr::null_mut();
        let code = facematch_identify(handle, probe.as_ptr(), probe.len(), &mut out);
        if out.is_null() {
            return (code, None);
        }
        let label = CStr::from_ptr(out).to_string_lossy().into_owned();
        facematch_string_free(out);
        (code, Some(label))
    }

    #[test]
    fn test_create_identify_release() {
        let n = names(&["A", "A", "B"]);
        let embeddings = [1.0f32, 0.0, 0.0, 1.0, 1.0, 0.0];
        unsafe {
            let mut handle = ptr::null_mut();
            let code = facematch_create(
                n.ptrs.as_ptr(),
                embeddings.as_ptr(),
                3,
                2,
                0.5,
                FACEMATCH_METRIC_COSINE,
                &mut handle,
            );
            assert_eq!(code, FACEMATCH_OK);
            assert!(!handle.is_null());

            assert_eq!(identify(handle, &[1.0, 0.0]), (FACEMATCH_OK, Some("B".into())));
            assert_eq!(
                identify(handle, &[-1.0, -1.0]),
                (FACEMATCH_OK, Some("UNKNOWN".into()))
            );
            assert_eq!(identify(handle, &[1.0]), (FACEMATCH_INVALID_EMBEDDING, None));

            facematch_release(handle);
            facematch_release(ptr::null_mut());
        }
    }

    #[test]
    fn test_create_errors() {
        let n = names(&["A"]);
        let embeddings = [0.0f32, 0.0];
        unsafe {
            let mut handle = ptr::null_mut();
            let code = facematch_create(
                n.ptrs.as_ptr(),
                embeddings.as_ptr(),
                1,
                2,
                0.5,
                FACEMATCH_METRIC_COSINE,
                &mut handle,
            );
            assert_eq!(code, FACEMATCH_DEGENERATE);
            assert!(handle.is_null());

            let code = facematch_create(
                n.ptrs.as_ptr(),
                embeddings.as_ptr(),
                1,
                2,
                0.5,
                7,
                &mut handle,
            );
            assert_eq!(code, FACEMATCH_CONFIG_ERR);

            let code = facematch_create(
                n.ptrs.as_ptr(),
                embeddings.as_ptr(),
                1,
                0,
                0.5,
                FACEMATCH_METRIC_L2,
                &mut handle,
            );
            assert_eq!(code, FACEMATCH_CONFIG_ERR);
            assert!(handle.is_null());
        }
    }

    #[test]
    fn test_invalid_utf8_names_are_refused() {
        let raw = [
            CStr::from_bytes_with_nul(b"\xff\0").unwrap(),
            CStr::from_bytes_with_nul(b"\xfe\0").unwrap(),
        ];
        let ptrs: Vec<*const c_char> = raw.iter().map(|s| s.as_ptr()).collect();
        let embeddings = [1.0f32, 0.0, 0.0, 1.0];
        unsafe {
            let mut handle = ptr::null_mut();
            let code = facematch_create(
                ptrs.as_ptr(),
                embeddings.as_ptr(),
                2,
                2,
                0.9,
                FACEMATCH_METRIC_COSINE,
                &mut handle,
            );
            assert_eq!(code, FACEMATCH_CONFIG_ERR);
            assert!(handle.is_null());
        }
    }

    #[test]
    fn test_distinct_names_stay_distinct() {
        let n = names(&["\u{e9}", "e\u{301}"]);
        let embeddings = [1.0f32, 0.0, 0.0, 1.0];
        unsafe {
            let mut handle = ptr::null_mut();
            let code = facematch_create(
                n.ptrs.as_ptr(),
                embeddings.as_ptr(),
                2,
                2,
                0.9,
                FACEMATCH_METRIC_COSINE,
                &mut handle,
            );
            assert_eq!(code, FACEMATCH_OK);
            assert_eq!((*handle).gallery().subject_count(), 2);
            assert_eq!(
                identify(handle, &[1.0, 0.0]),
                (FACEMATCH_OK, Some("\u{e9}".into()))
            );
            facematch_release(handle);
        }
    }

    #[test]
    fn test_oversized_gallery_is_refused() {
        let n = names(&["A"]);
        let embeddings = [1.0f32, 0.0];
        unsafe {
            let mut handle = ptr::null_mut();
            for count in [usize::MAX / 2 + 1, usize::MAX / 8 + 1] {
                let code = facematch_create(
                    n.ptrs.as_ptr(),
                    embeddings.as_ptr(),
                    count,
                    2,
                    0.5,
                    FACEMATCH_METRIC_COSINE,
                    &mut handle,
                );
                assert_eq!(code, FACEMATCH_CONFIG_ERR);
                assert!(handle.is_null());
            }
        }
    }

    #[test]
    fn test_null_arguments() {
        let n = names(&["A"]);
        let embeddings = [1.0f32, 0.0];
        let probe = [1.0f32, 0.0];
        unsafe {
            let mut handle = ptr::null_mut();
            assert_eq!(
                facematch_create(
                    n.ptrs.as_ptr(),
                    embeddings.as_ptr(),
                    1,
                    2,
                    0.5,
                    FACEMATCH_METRIC_COSINE,
                    ptr::null_mut(),
                ),
                FACEMATCH_NULL_ARG
            );

            let null_name: [*const c_char; 1] = [ptr::null()];
            assert_eq!(
                facematch_create(
                    null_name.as_ptr(),
                    embeddings.as_ptr(),
                    1,
                    2,
                    0.5,
                    FACEMATCH_METRIC_COSINE,
                    &mut handle,
                ),
                FACEMATCH_NULL_ARG
            );
            assert!(handle.is_null());

            assert_eq!(
                facematch_create(
                    ptr::null(),
                    embeddings.as_ptr(),
                    1,
                    2,
                    0.5,
                    FACEMATCH_METRIC_COSINE,
                    &mut handle,
                ),
                FACEMATCH_NULL_ARG
            );

            assert_eq!(
                identify(ptr::null(), &probe),
                (FACEMATCH_NULL_ARG, None)
            );

            let code = facematch_create(
                n.ptrs.as_ptr(),
                embeddings.as_ptr(),
                1,
                2,
                0.5,
                FACEMATCH_METRIC_COSINE,
                &mut handle,
            );
            assert_eq!(code, FACEMATCH_OK);
            assert_eq!(
                facematch_identify(handle, probe.as_ptr(), probe.len(), ptr::null_mut()),
                FACEMATCH_NULL_ARG
            );
            assert_eq!(identify(handle, &[]), (FACEMATCH_INVALID_EMBEDDING, None));
            facematch_release(handle);
            facematch_string_free(ptr::null_mut());
        }
    }

    #[test]
    fn test_standardize() {
        let mut v = [2.0f32, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        unsafe {
            assert_eq!(facematch_standardize(v.as_mut_ptr(), v.len()), FACEMATCH_OK);
            assert_eq!(facematch_standardize(v.as_mut_ptr(), 0), FACEMATCH_DEGENERATE);
            assert_eq!(facematch_standardize(ptr::null_mut(), 3), FACEMATCH_NULL_ARG);
        }
        // mean 5, std 2
        assert!((v[0] + 1.5).abs() < 1e-6);
        assert!((v[7] - 2.0).abs() < 1e-6);
    }
}
