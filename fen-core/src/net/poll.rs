//! Readiness multiplexing over the gateway's socket set.

use std::io;
use std::os::fd::RawFd;

/// Wait up to `timeout_ms` for any fd to become readable. Returns a bitmask
/// where bit `i` is set when `fds[i]` is readable, errored, or hung up
/// (the read path surfaces the latter two as I/O errors).
pub fn wait_readable(fds: &[RawFd], timeout_ms: i32) -> io::Result<u32> {
    debug_assert!(fds.len() <= 32);
    let mut pfds: Vec<libc::pollfd> = fds
        .iter()
        .map(|&fd| libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    let rc = unsafe { libc::poll(pfds.as_mut_ptr(), pfds.len() as libc::nfds_t, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(0);
        }
        return Err(err);
    }

    let mut mask = 0u32;
    for (i, p) in pfds.iter().enumerate() {
        if p.revents & (libc::POLLIN | libc::POLLERR | libc::POLLHUP) != 0 {
            mask |= 1 << i;
        }
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::AsRawFd;

    #[test]
    fn times_out_with_no_data() {
        let (a, _b) = std::os::unix::net::UnixStream::pair().unwrap();
        let mask = wait_readable(&[a.as_raw_fd()], 10).unwrap();
        assert_eq!(mask, 0);
    }

    #[test]
    fn reports_readable_fd() {
        let (a, mut b) = std::os::unix::net::UnixStream::pair().unwrap();
        b.write_all(b"x").unwrap();
        let mask = wait_readable(&[a.as_raw_fd()], 100).unwrap();
        assert_eq!(mask & 1, 1);
    }

    #[test]
    fn second_fd_maps_to_second_bit() {
        let (a, _a2) = std::os::unix::net::UnixStream::pair().unwrap();
        let (b, mut b2) = std::os::unix::net::UnixStream::pair().unwrap();
        b2.write_all(b"x").unwrap();
        let mask = wait_readable(&[a.as_raw_fd(), b.as_raw_fd()], 100).unwrap();
        assert_eq!(mask, 0b10);
    }
}
