//! Contador de reintentos por wrapper.

use std::sync::atomic::{AtomicU32, Ordering};

/// Intentos consumidos y cota de reintentos.
///
/// Un `OperationProcessor` tiene uno propio que comparten todas sus
/// invocaciones concurrentes; `invoke_with` permite pasar uno por llamada.
/// `max_attempts` cuenta reintentos tras el primer intento: el contador sube
/// justo antes de cada llamada y se reintenta mientras
/// `attempts <= max_attempts`.
#[derive(Debug)]
pub struct RetryState {
    attempts: AtomicU32,
    max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self { attempts: AtomicU32::new(0),
               max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Registra un intento y devuelve el total tras incrementarlo.
    pub fn begin_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn should_retry(&self) -> bool {
        self.attempts() <= self.max_attempts
    }

    pub fn reset(&self) {
        self.attempts.store(0, Ordering::SeqCst);
    }
}
