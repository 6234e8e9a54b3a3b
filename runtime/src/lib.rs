//! Soporte de ejecución para programas instrumentados.
//!
//! # Propósito
//! El módulo JavaScript que emite el compilador no realiza E/S por sí
//! mismo: toda escritura, lectura y reporte de estado pasa por un
//! anfitrión. Esta biblioteca implementa el lado del anfitrión para
//! quien ejecute el programa desde Rust, por ejemplo un editor con un
//! intérprete embebido.
//!
//! # Sesiones
//! Una [`Session`] admite a lo sumo una ejecución en curso. Cada
//! ejecución reparte dos extremos: [`Program`], que usa el intérprete
//! para escribir, leer y reportar trazas, y [`Console`], que usa la
//! interfaz para recibir solicitudes y suplir valores. Una lectura
//! bloquea al programa hasta recibir exactamente una respuesta.
//!
//! # Cancelación
//! Cancelar una ejecución cierra sus canales. Una lectura pendiente
//! termina con [`SessionError::Cancelled`], y una consola vieja nunca
//! puede entregar valores a una ejecución más reciente.

mod session;

pub use session::{Console, Program, Request, Session, SessionError, Trace};
