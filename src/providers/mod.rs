pub mod tgju;
