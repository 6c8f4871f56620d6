//! Connection session management.
//!
//! A session tracks one client connection and the interactive simulation
//! sessions it has opened, so they can be disposed of when the connection
//! goes away.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use uuid::Uuid;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, processing requests.
    Connected,
    /// Client said goodbye; the connection is winding down.
    Closing,
}

/// A client session.
pub struct Session {
    /// Unique session ID.
    pub id: String,

    /// Remote address.
    pub remote_addr: SocketAddr,

    /// Session state.
    state: SessionState,

    /// Request counter.
    request_count: AtomicU64,

    /// Session creation time.
    created_at: Instant,

    /// Last activity time.
    last_activity: std::sync::Mutex<Instant>,

    /// Simulation sessions opened interactively on this connection and not
    /// yet ended.
    simulations: std::sync::Mutex<HashSet<u64>>,
}

impl Session {
    /// Creates a new session.
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            remote_addr,
            state: SessionState::Connected,
            request_count: AtomicU64::new(0),
            created_at: Instant::now(),
            last_activity: std::sync::Mutex::new(Instant::now()),
            simulations: std::sync::Mutex::new(HashSet::new()),
        }
    }

    /// Returns the session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Sets the session state.
    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// Records a request.
    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        *self.last_activity.lock().unwrap() = Instant::now();
    }

    /// Returns the request count.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Returns the time since last activity.
    pub fn idle_duration(&self) -> std::time::Duration {
        self.last_activity.lock().unwrap().elapsed()
    }

    /// Returns the session age.
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Remembers a simulation session started on this connection.
    pub fn track_simulation(&self, id: u64) {
        self.simulations.lock().unwrap().insert(id);
    }

    /// Forgets a simulation session that was ended explicitly.
    pub fn untrack_simulation(&self, id: u64) -> bool {
        self.simulations.lock().unwrap().remove(&id)
    }

    /// Returns the simulation sessions still owned by this connection.
    pub fn owned_simulations(&self) -> Vec<u64> {
        self.simulations.lock().unwrap().iter().copied().collect()
    }

    /// Returns the number of still-open simulation sessions.
    pub fn simulation_count(&self) -> usize {
        self.simulations.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 12345)
    }

    #[test]
    fn test_session_creation() {
        let session = Session::new(test_addr());
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.request_count(), 0);
        assert_eq!(session.simulation_count(), 0);
    }

    #[test]
    fn test_record_request() {
        let session = Session::new(test_addr());
        session.record_request();
        session.record_request();
        assert_eq!(session.request_count(), 2);
    }

    #[test]
    fn test_simulation_tracking() {
        let session = Session::new(test_addr());
        session.track_simulation(3);
        session.track_simulation(7);
        assert_eq!(session.simulation_count(), 2);

        assert!(session.untrack_simulation(3));
        assert!(!session.untrack_simulation(3));
        assert_eq!(session.owned_simulations(), vec![7]);
    }

    #[test]
    fn test_closing_state() {
        let mut session = Session::new(test_addr());
        session.set_state(SessionState::Closing);
        assert_eq!(session.state(), SessionState::Closing);
    }
}
