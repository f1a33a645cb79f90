//! Amazon Bedrock plumbing shared by embedding and generation

mod runtime;

pub use runtime::{BedrockClient, BedrockClientTrait};

#[cfg(test)]
pub use runtime::mock::MockBedrockClient;

use crate::config::AwsConfig;

/// Load the AWS SDK configuration, honouring an explicit region override
pub async fn load_sdk_config(config: &AwsConfig) -> aws_config::SdkConfig {
    let loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

    match &config.region {
        Some(region) => {
            loader
                .region(aws_config::Region::new(region.clone()))
                .load()
                .await
        }
        None => loader.load().await,
    }
}
