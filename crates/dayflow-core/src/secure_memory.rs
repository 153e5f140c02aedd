//! Locked, zero-on-drop buffers for decrypted payloads and raw key bytes.
//!
//! Pages are pinned with `mlock` (Unix) or `VirtualLock` (Windows) so decrypted journal text
//! and key material never reach swap. Locking is best effort; the buffer is always zeroed.

use std::ptr;

fn pin(ptr: *mut u8, len: usize) -> bool {
    #[cfg(unix)]
    {
        // SAFETY: ptr/len describe a live allocation owned by the caller.
        unsafe { libc::mlock(ptr as *const libc::c_void, len) == 0 }
    }
    #[cfg(windows)]
    {
        // SAFETY: ptr/len describe a live allocation owned by the caller.
        unsafe {
            windows_sys::Win32::System::Memory::VirtualLock(ptr as *const std::ffi::c_void, len) != 0
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (ptr, len);
        true
    }
}

fn unpin(ptr: *mut u8, len: usize) {
    #[cfg(unix)]
    // SAFETY: region was pinned by `pin` with the same ptr/len.
    unsafe {
        libc::munlock(ptr as *const libc::c_void, len);
    }
    #[cfg(windows)]
    // SAFETY: region was pinned by `pin` with the same ptr/len.
    unsafe {
        windows_sys::Win32::System::Memory::VirtualUnlock(ptr as *const std::ffi::c_void, len);
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (ptr, len);
    }
}

/// Overwrite `buf` with zeros using volatile writes the optimizer cannot elide.
pub fn wipe(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        // SAFETY: `b` is a valid, aligned &mut u8.
        unsafe { ptr::write_volatile(b, 0) };
    }
}

/// Owned byte buffer pinned in RAM and wiped on drop.
pub struct SecretBuf {
    inner: Vec<u8>,
    pinned: bool,
}

impl SecretBuf {
    pub fn new(mut data: Vec<u8>) -> Self {
        if data.is_empty() {
            return Self { inner: data, pinned: false };
        }
        let pinned = pin(data.as_mut_ptr(), data.len());
        if !pinned {
            tracing::debug!(
                target: "dayflow::secure_memory",
                len = data.len(),
                "memory lock refused; plaintext buffer may be swapped"
            );
        }
        Self { inner: data, pinned }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.inner
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl AsRef<[u8]> for SecretBuf {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl Drop for SecretBuf {
    fn drop(&mut self) {
        if self.inner.is_empty() {
            return;
        }
        wipe(&mut self.inner);
        if self.pinned {
            unpin(self.inner.as_mut_ptr(), self.inner.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wipe_zeroes_every_byte() {
        let mut data = vec![0xAAu8; 64];
        wipe(&mut data);
        assert!(data.iter().all(|b| *b == 0));
    }

    #[test]
    fn secret_buf_exposes_contents() {
        let buf = SecretBuf::new(b"journal entry".to_vec());
        assert_eq!(buf.as_slice(), b"journal entry");
        assert_eq!(buf.len(), 13);
        assert!(SecretBuf::new(Vec::new()).is_empty());
    }
}
