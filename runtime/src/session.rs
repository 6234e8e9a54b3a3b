use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc, Mutex, PoisonError,
};

use std::cell::Cell;
use thiserror::Error;
use tracing::debug;

/// Un error durante una ejecución.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Ya existe una ejecución en curso.
    #[error("A program is already running")]
    Busy,

    /// La ejecución fue cancelada o su otro extremo ya no existe.
    #[error("The run was cancelled")]
    Cancelled,

    /// Se intentó suplir un valor sin una lectura pendiente.
    #[error("The program is not waiting for input")]
    NotWaiting,

    /// La consola pertenece a una ejecución que ya terminó.
    #[error("This console belongs to a finished run")]
    Stale,
}

/// Estado reportado por un llamado a `trace`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trace {
    /// Línea original del pseudocódigo.
    pub line: u32,

    /// Una entrada por variable, en el orden de `SLOTS`.
    pub snapshot: Vec<String>,

    /// Texto escrito por la sentencia, si fue una escritura.
    pub output: Option<String>,
}

/// Solicitud del programa hacia el anfitrión.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Write(String),
    Read { label: String },
    Trace(Trace),
}

/// Ocupación de una sesión, compartida por ambos extremos.
#[derive(Debug)]
struct Slot {
    active: Arc<Mutex<Option<u64>>>,
    run: u64,
}

impl Slot {
    fn is_current(&self) -> bool {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) == Some(self.run)
    }

    /// Libera la sesión si todavía pertenece a esta ejecución.
    fn release(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active == Some(self.run) {
            debug!(run = self.run, "run released");
            *active = None;
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.release();
    }
}

/// Corredor de ejecuciones.
#[derive(Debug, Default)]
pub struct Session {
    active: Arc<Mutex<Option<u64>>>,
    runs: Mutex<u64>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// Determina si hay una ejecución en curso.
    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Inicia una ejecución.
    ///
    /// Falla con [`SessionError::Busy`] si otra ejecución sigue en curso.
    /// La ejecución termina cuando se descarta su [`Program`] o cuando se
    /// cancela o descarta su [`Console`].
    pub fn start(&self) -> Result<(Program, Console), SessionError> {
        let run = {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.is_some() {
                return Err(SessionError::Busy);
            }

            let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
            *runs += 1;
            *active = Some(*runs);
            *runs
        };

        debug!(run, "run started");

        let (requests, incoming) = mpsc::channel();
        let (replies, answers) = mpsc::channel();
        let slot = Arc::new(Slot {
            active: Arc::clone(&self.active),
            run,
        });

        let program = Program {
            requests,
            answers,
            slot: Arc::clone(&slot),
        };

        let console = Console {
            incoming,
            replies,
            pending: Cell::new(false),
            slot,
        };

        Ok((program, console))
    }
}

/// Extremo del programa en ejecución.
#[derive(Debug)]
pub struct Program {
    requests: Sender<Request>,
    answers: Receiver<String>,
    slot: Arc<Slot>,
}

impl Program {
    /// Escribe una línea de salida, sin esperar respuesta.
    pub fn write(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(Request::Write(text.into()))
    }

    /// Solicita un valor y bloquea hasta recibirlo.
    pub fn read(&self, label: impl Into<String>) -> Result<String, SessionError> {
        self.send(Request::Read {
            label: label.into(),
        })?;

        self.answers.recv().map_err(|_| SessionError::Cancelled)
    }

    /// Reporta el estado de las variables luego de una sentencia.
    pub fn trace(&self, trace: Trace) -> Result<(), SessionError> {
        self.send(Request::Trace(trace))
    }

    fn send(&self, request: Request) -> Result<(), SessionError> {
        if !self.slot.is_current() {
            return Err(SessionError::Cancelled);
        }

        self.requests.send(request).map_err(|_| SessionError::Cancelled)
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.slot.release();
    }
}

/// Extremo del anfitrión de una ejecución.
#[derive(Debug)]
pub struct Console {
    incoming: Receiver<Request>,
    replies: Sender<String>,
    pending: Cell<bool>,
    slot: Arc<Slot>,
}

impl Console {
    /// Espera la siguiente solicitud del programa.
    ///
    /// Retorna `None` cuando el programa terminó y ya no quedan
    /// solicitudes por atender.
    pub fn next_request(&self) -> Option<Request> {
        let request = self.incoming.recv().ok()?;
        if let Request::Read { .. } = request {
            self.pending.set(true);
        }

        Some(request)
    }

    /// Entrega el valor de una lectura pendiente.
    pub fn supply(&self, value: impl Into<String>) -> Result<(), SessionError> {
        if !self.slot.is_current() {
            return Err(SessionError::Stale);
        } else if !self.pending.get() {
            return Err(SessionError::NotWaiting);
        }

        self.pending.set(false);
        self.replies
            .send(value.into())
            .map_err(|_| SessionError::Cancelled)
    }

    /// Cancela la ejecución, liberando la sesión de inmediato.
    pub fn cancel(self) {
        debug!(run = self.slot.run, "run cancelled");
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.slot.release();
    }
}
