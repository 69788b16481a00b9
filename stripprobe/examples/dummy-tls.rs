//! Stand-in for a TLS client: calls a read and a write routine forever
//!
//! Build it, measure the routines' offsets from `.text`, strip it, probe it:
//!
//! ```bash
//! cargo build --release --example dummy-tls
//! cp target/release/examples/dummy-tls /tmp/ref && strip -o /tmp/client /tmp/ref
//! nm /tmp/ref | grep -E 'dummy_tls_(read|write)'     # function addresses
//! readelf -SW /tmp/ref | grep ' .text'               # .text address
//! sudo stripprobe /tmp/client <read - text> <write - text>
//! ```

#![allow(unsafe_code)] // #[no_mangle] keeps the symbol names nm looks for

use std::hint::black_box;
use std::time::Duration;

use tokio::time::sleep;

#[inline(never)]
#[no_mangle]
pub extern "C" fn dummy_tls_read(buf: *mut u8, len: usize) -> isize {
    let buf = black_box(buf);
    if buf.is_null() {
        return -1;
    }
    black_box(len.min(16)) as isize
}

#[inline(never)]
#[no_mangle]
pub extern "C" fn dummy_tls_write(buf: *const u8, len: usize) -> isize {
    let buf = black_box(buf);
    if buf.is_null() {
        return -1;
    }
    black_box(len) as isize
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("dummy-tls pid {}", std::process::id());
    println!("   calling dummy_tls_write/dummy_tls_read every second\n");

    let request = b"GET / HTTP/1.1\r\nHost: example\r\n\r\n";
    let mut response = [0u8; 64];

    for round in 0u64.. {
        let written = dummy_tls_write(request.as_ptr(), request.len());
        let read = dummy_tls_read(response.as_mut_ptr(), response.len());
        println!("[round {round}] wrote {written}, read {read}");
        sleep(Duration::from_secs(1)).await;
    }
}
