mod rabbit;

pub use rabbit::{AmqpSettings, RabbitPublisher};
