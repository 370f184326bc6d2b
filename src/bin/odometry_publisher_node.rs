use anyhow::{Context as _, Error, Result};
use encoder_odometry::{
    common::types::Stamp,
    lifecycle::LifecycleNode,
    logging,
    messages::{self, FrameIds},
    perception::{OdometryStack, ProcessError},
    OdometryConfig, PoseEstimate,
};
use log::{debug, error, info};
use rclrs::{
    Context, CreateBasicExecutor, Node, RclrsErrorFilter, SpinOptions, QOS_PROFILE_DEFAULT,
};
use std::sync::{Arc, Mutex};
use std::thread;

use nav_msgs::msg::Odometry;
use std_msgs::msg::Float64MultiArray;
use tf2_msgs::msg::TFMessage;

struct OdometryPublisherNode {
    stack: Mutex<OdometryStack>,
    node: Arc<Node>,
    odom_publisher: Arc<rclrs::Publisher<Odometry>>,
    tf_publisher: Option<Arc<rclrs::Publisher<TFMessage>>>,
    sample_subscription: Mutex<Option<Arc<rclrs::Subscription<Float64MultiArray>>>>,
    frames: FrameIds,
}

fn string_param(node: &Node, name: &str, default: &str) -> Result<String> {
    let param = node
        .declare_parameter::<Arc<str>>(name)
        .default(Arc::from(default))
        .mandatory()
        .with_context(|| format!("Failed to declare parameter `{}`", name))?;
    Ok(param.get().to_string())
}

fn bool_param(node: &Node, name: &str, default: bool) -> Result<bool> {
    let param = node
        .declare_parameter::<bool>(name)
        .default(default)
        .mandatory()
        .with_context(|| format!("Failed to declare parameter `{}`", name))?;
    Ok(param.get())
}

fn f64_param(node: &Node, name: &str, default: f64) -> Result<f64> {
    let param = node
        .declare_parameter::<f64>(name)
        .default(default)
        .mandatory()
        .with_context(|| format!("Failed to declare parameter `{}`", name))?;
    Ok(param.get())
}

/// Read every setting from ROS parameters, falling back to the defaults
fn read_config(node: &Node) -> Result<OdometryConfig> {
    let defaults = OdometryConfig::default();
    let config = OdometryConfig {
        input_topic: string_param(node, "input_topic", &defaults.input_topic)?,
        odom_topic: string_param(node, "odom_topic", &defaults.odom_topic)?,
        tf_topic: string_param(node, "tf_topic", &defaults.tf_topic)?,
        odom_frame: string_param(node, "odom_frame", &defaults.odom_frame)?,
        base_frame: string_param(node, "base_frame", &defaults.base_frame)?,
        publish_tf: bool_param(node, "publish_tf", defaults.publish_tf)?,
        startup_delay_secs: f64_param(node, "startup_delay_secs", defaults.startup_delay_secs)?,
        seed_from_first_sample: bool_param(
            node,
            "seed_from_first_sample",
            defaults.seed_from_first_sample,
        )?,
    };
    config.validate()?;
    Ok(config)
}

fn clock_stamp(node: &Node) -> Stamp {
    Stamp::from_nanos(node.get_clock().now().nsec)
}

impl OdometryPublisherNode {
    pub fn new(
        executor: &rclrs::Executor,
        name: &str,
    ) -> Result<(Arc<Self>, OdometryConfig)> {
        let node = executor.create_node(name)?;
        let config = read_config(&node)?;

        info!(
            "Topics: input={}, odom={}, tf={} (publish_tf={})",
            config.input_topic, config.odom_topic, config.tf_topic, config.publish_tf
        );
        info!(
            "Frames: {} -> {}, seed_from_first_sample={}",
            config.odom_frame, config.base_frame, config.seed_from_first_sample
        );

        let odom_publisher =
            node.create_publisher::<Odometry>(&config.odom_topic, QOS_PROFILE_DEFAULT)?;
        let tf_publisher = if config.publish_tf {
            Some(node.create_publisher::<TFMessage>(&config.tf_topic, QOS_PROFILE_DEFAULT)?)
        } else {
            None
        };

        let constructed_at = clock_stamp(&node);
        let stack = OdometryStack::new(config.baseline_policy(), move || constructed_at);

        let odometry_node = Arc::new(OdometryPublisherNode {
            stack: Mutex::new(stack),
            node,
            odom_publisher,
            tf_publisher,
            sample_subscription: None.into(),
            frames: FrameIds {
                odom: config.odom_frame.clone(),
                base: config.base_frame.clone(),
            },
        });

        let odometry_node_clone = Arc::clone(&odometry_node);
        let sample_subscription = odometry_node
            .node
            .create_subscription::<Float64MultiArray, _>(
                &config.input_topic,
                QOS_PROFILE_DEFAULT,
                move |msg: Float64MultiArray| {
                    odometry_node_clone.sample_callback(msg);
                },
            )?;

        if let Ok(mut slot) = odometry_node.sample_subscription.lock() {
            *slot = Some(sample_subscription);
        }

        Ok((odometry_node, config))
    }

    fn with_stack<T>(&self, f: impl FnOnce(&mut OdometryStack) -> T) -> Result<T> {
        let mut stack = self
            .stack
            .lock()
            .map_err(|_| anyhow::anyhow!("odometry stack lock poisoned"))?;
        Ok(f(&mut stack))
    }

    fn sample_callback(&self, msg: Float64MultiArray) {
        let stamp = clock_stamp(&self.node);
        let result = match self.with_stack(|stack| stack.process_fields(&msg.data, stamp)) {
            Ok(result) => result,
            Err(e) => {
                error!("{}", e);
                return;
            }
        };

        match result {
            Ok(estimate) => self.publish(&estimate),
            // Faults are counted and logged by the stack
            Err(ProcessError::Odometry(_)) => {}
            Err(ProcessError::Lifecycle(e)) => debug!("{}", e),
        }
    }

    fn publish(&self, estimate: &PoseEstimate) {
        if let Some(tf_publisher) = &self.tf_publisher {
            if let Err(e) = tf_publisher.publish(&messages::tf_message(estimate, &self.frames)) {
                error!("Failed to publish transform: {}", e);
            }
        }

        if let Err(e) = self
            .odom_publisher
            .publish(&messages::odometry_msg(estimate, &self.frames))
        {
            error!("Failed to publish odometry: {}", e);
        }
    }
}

fn main() -> Result<(), Error> {
    let level = std::env::var("ODOMETRY_LOG").unwrap_or_default();
    logging::logger_init(logging::level_from_str(&level))?;

    info!("Initializing odometry publisher...");

    let mut executor = Context::default_from_env()?.create_basic_executor();
    let (odometry_node, config) = OdometryPublisherNode::new(&executor, "odometry_publisher")?;

    odometry_node.with_stack(|stack| stack.on_configure())??;

    thread::sleep(config.startup_delay());
    odometry_node.with_stack(|stack| stack.on_activate())??;

    info!("Odometry publisher ready, listening on {}", config.input_topic);

    let spun: Result<(), Error> = executor
        .spin(SpinOptions::default())
        .first_error()
        .map_err(|err| err.into());

    odometry_node.with_stack(|stack| -> Result<()> {
        stack.on_deactivate()?;
        stack.on_cleanup()?;
        stack.on_shutdown()?;
        Ok(())
    })??;

    spun
}
