/*!
 * Task Execution
 *
 * A fixed-size worker pool draining a bounded task buffer:
 * - blocking coordination (mutex + condition variable), the one place
 *   in this crate where idle threads sleep in the OS
 * - backpressure by refusal: a full buffer fails the submit, it never
 *   blocks the producer or grows the buffer
 */

mod thread_pool;

pub use thread_pool::ThreadPool;
