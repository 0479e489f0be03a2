use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_slot::define_cache;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

define_cache! {
   /// Specialties offered by the clinic.
   fn specialties() -> Vec<&'static str> {
      COUNTER.fetch_add(1, Ordering::Relaxed);
      println!("Loading specialties...");
      // Simulate work
      std::thread::sleep(std::time::Duration::from_millis(50));
      vec!["Specialty One", "Specialty Two"]
   }
}

fn main() {
   // Warm the slot first so the threads below only ever hit the cache
   println!("First access: {:?}", specialties());

   let threads: Vec<_> = (0..5)
      .map(|i| {
         std::thread::spawn(move || {
            println!("Thread {i} access: {:?}", specialties());
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   assert_eq!(specialties(), ["Specialty One", "Specialty Two"]);
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1); // Loader ran only once
   println!("Cached under: {}", specialties::IDENTITY);
}
