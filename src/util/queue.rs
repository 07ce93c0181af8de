//! Hand-off from worker threads back to the UI thread.
//!
//! Nodes, handlers and the history are `Rc` based and may only be touched on the UI thread.
//! Background work sends a closure through a [`TaskSender`] instead, and the UI thread runs it
//! on its next frame via [`TaskQueue::pending`].

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

pub type Task<T> = Box<dyn FnOnce(&mut T) + Send>;

pub struct TaskQueue<T> {
    tx: Sender<Task<T>>,
    rx: Receiver<Task<T>>,
    wake: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl<T> std::fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "Task Queue")
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx, wake: None }
    }

    /// `wake` gets called every time a task is sent, so an idle UI can schedule another frame
    pub fn with_wake(wake: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            wake: Some(Arc::new(wake)),
            ..Self::new()
        }
    }

    pub fn sender(&self) -> TaskSender<T> {
        TaskSender {
            tx: self.tx.clone(),
            wake: self.wake.clone(),
        }
    }

    /// Takes everything queued so far. The caller runs the tasks, this way the queue can live
    /// inside the value the tasks mutate
    pub fn pending(&self) -> Vec<Task<T>> {
        self.rx.try_iter().collect()
    }
}

pub struct TaskSender<T> {
    tx: Sender<Task<T>>,
    wake: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl<T> Clone for TaskSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            wake: self.wake.clone(),
        }
    }
}

impl<T> TaskSender<T> {
    /// Queue `f` to run on the UI thread. Returns false if the queue is gone (the app closed)
    pub fn invoke(&self, f: impl FnOnce(&mut T) + Send + 'static) -> bool {
        if self.tx.send(Box::new(f)).is_err() {
            log::debug!("task queue closed, dropping task");
            return false;
        }
        if let Some(wake) = &self.wake {
            wake();
        }
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_worker_results_arrive_on_drain() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let wake_counter = wakes.clone();
        let queue: TaskQueue<Vec<u32>> = TaskQueue::with_wake(move || {
            wake_counter.fetch_add(1, Ordering::Relaxed);
        });

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sender = queue.sender();
                std::thread::spawn(move || {
                    sender.invoke(move |results: &mut Vec<u32>| results.push(i));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut results = Vec::new();
        // nothing runs until the owner drains
        assert!(results.is_empty());
        for task in queue.pending() {
            task(&mut results);
        }
        results.sort();

        assert_eq!(results, vec![0, 1, 2, 3]);
        assert_eq!(wakes.load(Ordering::Relaxed), 4);
        assert!(queue.pending().is_empty());
    }
}
