//! The OS primitives the executor builds on. Everything that touches the operating system goes
//! through [`PlatformActions`] so the command mapping can be exercised against a test double.

use std::{
    io,
    net::{SocketAddrV4, UdpSocket},
};

/// One method per OS primitive. Implementations block; the executor calls them from the blocking
/// thread pool.
pub trait PlatformActions: Send + Sync {
    /// Starts the system shutdown utility with `args` and returns without waiting for it.
    fn run_shutdown(&self, args: &[&str]) -> io::Result<()>;

    /// Asks every top level window to power the monitors down. Bounded by a short timeout.
    fn turn_screen_off(&self) -> io::Result<()>;

    fn lock_workstation(&self) -> io::Result<()>;

    /// Sends `payload` as a single UDP datagram with broadcast enabled.
    fn broadcast_datagram(&self, payload: &[u8], target: SocketAddrV4) -> io::Result<()>;
}

/// The real OS bindings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePlatform;

#[cfg(windows)]
mod native {
    use std::{io, os::windows::process::CommandExt, process::Command};

    use windows::Win32::{
        Foundation::{LPARAM, WPARAM},
        System::Shutdown::LockWorkStation,
        UI::WindowsAndMessaging::{
            SendMessageTimeoutW, HWND_BROADCAST, SC_MONITORPOWER, SMTO_ABORTIFHUNG, WM_SYSCOMMAND,
        },
    };

    const CREATE_NO_WINDOW: u32 = 0x08000000;

    /// `lParam` value for SC_MONITORPOWER meaning "off".
    const MONITOR_OFF: isize = 2;

    /// A hung display driver must not hold the caller for longer than this.
    const SCREEN_OFF_TIMEOUT_MS: u32 = 1000;

    pub fn run_shutdown(args: &[&str]) -> io::Result<()> {
        Command::new("shutdown.exe")
            .args(args)
            .creation_flags(CREATE_NO_WINDOW)
            .spawn()?;

        Ok(())
    }

    pub fn turn_screen_off() -> io::Result<()> {
        let mut result = 0usize;
        let sent = unsafe {
            SendMessageTimeoutW(
                HWND_BROADCAST,
                WM_SYSCOMMAND,
                WPARAM(SC_MONITORPOWER as usize),
                LPARAM(MONITOR_OFF),
                SMTO_ABORTIFHUNG,
                SCREEN_OFF_TIMEOUT_MS,
                Some(&mut result as *mut usize),
            )
        };

        if sent.0 == 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    pub fn lock_workstation() -> io::Result<()> {
        unsafe { LockWorkStation() }.map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

#[cfg(not(windows))]
mod native {
    use std::io;

    fn unsupported(action: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{action} is only supported on Windows"),
        )
    }

    pub fn run_shutdown(_args: &[&str]) -> io::Result<()> {
        Err(unsupported("shutdown"))
    }

    pub fn turn_screen_off() -> io::Result<()> {
        Err(unsupported("turning the screen off"))
    }

    pub fn lock_workstation() -> io::Result<()> {
        Err(unsupported("locking the workstation"))
    }
}

impl PlatformActions for NativePlatform {
    fn run_shutdown(&self, args: &[&str]) -> io::Result<()> {
        native::run_shutdown(args)
    }

    fn turn_screen_off(&self) -> io::Result<()> {
        native::turn_screen_off()
    }

    fn lock_workstation(&self) -> io::Result<()> {
        native::lock_workstation()
    }

    fn broadcast_datagram(&self, payload: &[u8], target: SocketAddrV4) -> io::Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;

        let sent = socket.send_to(payload, target)?;
        if sent != payload.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {sent} of {} bytes to {target}", payload.len()),
            ));
        }

        Ok(())
    }
}
