// confchannel is a Conflation Channel.
// Both send and recv are guaranteed not
// to block on each other for long: readers only ever
// see the most recent value. We can only have one
// Sender but can have any number of Receivers.

use std::sync::{Arc, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::errors::*;

struct Channel<T: Clone> {
	data: [RwLock<Option<T>>; 2],
	dropped_sender: AtomicBool,
	ind: AtomicUsize,
	num_receivers: AtomicUsize,
}

pub struct Sender<T: Clone>{
	chan: Arc<Channel<T>>,
	ind: usize,
}

pub struct Receiver<T: Clone>{
	chan: Arc<Channel<T>>,
}

pub fn confchannel<T: Clone>() -> (Sender<T>, Receiver<T>) {
	let chan = Arc::new(Channel{
		data: [RwLock::new(None), RwLock::new(None)],
		dropped_sender: AtomicBool::new(false),
		ind: AtomicUsize::new(0),
		num_receivers: AtomicUsize::new(1),
	});

	(Sender{chan: chan.clone(), ind: 0}, Receiver{chan: chan})
}

impl<T: Clone> Drop for Sender<T> {
	fn drop(&mut self) {
		self.chan.dropped_sender.store(true, Ordering::SeqCst);
	}
}

impl<T: Clone> Sender<T> {
	// Returns the number of live receivers. Zero means
	// nobody is listening and the producer may stop.
	pub fn send(&mut self, data: T) -> usize {
		{
			let mut slot = self.chan.data[self.ind].write()
				.unwrap_or_else(|poisoned| poisoned.into_inner());
			*slot = Some(data);
		}

		self.chan.ind.store(self.ind, Ordering::SeqCst);
		self.ind = (self.ind + 1) % 2;
		self.chan.num_receivers.load(Ordering::SeqCst)
	}
}

impl<T: Clone> Receiver<T> {
	// Ok(None) until the first value has been sent.
	pub fn recv(&self) -> Result<Option<T>> {
		if self.chan.dropped_sender.load(Ordering::SeqCst) {
			return Err(Box::new(Error::SenderClosed));
		}
		let ind = self.chan.ind.load(Ordering::SeqCst);
		let slot = self.chan.data[ind].read()
			.unwrap_or_else(|poisoned| poisoned.into_inner());
		Ok(slot.clone())
	}
}

impl<T: Clone> Clone for Receiver<T> {
	fn clone(&self) -> Self {
		self.chan.num_receivers.fetch_add(1, Ordering::SeqCst);
		Self{
			chan: self.chan.clone(),
		}
	}
}

impl<T: Clone> Drop for Receiver<T> {
	fn drop(&mut self) {
		self.chan.num_receivers.fetch_sub(1, Ordering::SeqCst);
	}
}
