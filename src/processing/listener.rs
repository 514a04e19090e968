use std::thread;

use tokio::sync::mpsc;

/// Binds a ZMQ PULL socket and forwards every frame, trimmed, to `sender`.
///
/// The socket is serviced on its own OS thread since `zmq` sockets block.
/// The thread exits once the receiving side of `sender` is dropped.
pub fn spawn_zmq_listener(
    address: &str,
    sender: mpsc::Sender<String>,
) -> Result<thread::JoinHandle<()>, zmq::Error> {
    let context = zmq::Context::new();
    let socket = context.socket(zmq::PULL)?;
    socket.bind(address)?;
    log::info!("Listening for jobs on {address}");

    Ok(thread::spawn(move || {
        loop {
            let key = match socket.recv_string(0) {
                Ok(Ok(key)) => key.trim().to_string(),
                Ok(Err(bytes)) => {
                    log::error!("Dropping non UTF-8 message of {} bytes", bytes.len());
                    continue;
                }
                Err(e) => {
                    log::error!("Failed to receive message: {e}");
                    continue;
                }
            };
            if sender.blocking_send(key).is_err() {
                log::info!("Dispatcher is gone, listener stopping");
                break;
            }
        }
    }))
}
