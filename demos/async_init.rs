use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_slot::define_cache;
use tokio::time::{sleep, Duration};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

define_cache! {
   async fn remote_data() -> String {
      COUNTER.fetch_add(1, Ordering::Relaxed);
      println!("Loading remote data...");
      sleep(Duration::from_millis(50)).await;
      "Async expensive data".to_string()
   }
}

#[tokio::main]
async fn main() {
   let tasks: Vec<_> = (0..5)
      .map(|_| {
         tokio::spawn(async {
            println!("Task access: {}", remote_data().await);
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }

   // Concurrent first accesses may each have run the loader
   let runs = COUNTER.load(Ordering::Relaxed);
   println!("Loader ran {runs} time(s)");
   assert!((1..=5).contains(&runs));

   // Once settled, the slot answers without loading again
   println!("Final data: {}", remote_data().await);
   assert_eq!(COUNTER.load(Ordering::Relaxed), runs);
}
